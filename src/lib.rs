//! twinfind - concurrent duplicate file finder
//!
//! Walks a directory tree, pairs files of equal size (and, by default,
//! equal name), confirms pairs by BLAKE3 content hash on a bounded worker
//! pool and reports groups of identical files in a deterministic order.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, DuplicateGroup, ScanSummary};
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::progress::Progress;

/// Run a scan for a parsed command line and print the report to stdout.
///
/// # Errors
///
/// Returns an error for fatal conditions: a missing or non-directory root,
/// a path registered twice, a panicked worker, an interrupt, or a failure to
/// write the report. Unreadable files are not errors; they are reported in
/// the summary and yield [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::for_cli(&cli);
    log::debug!("Effective configuration: {:?}", config);

    let handler = signal::install_handler().context("Failed to set up Ctrl+C handling")?;

    let mut finder_config = config.finder_config().with_shutdown_flag(handler.flag());
    let show_progress =
        !cli.quiet && !cli.output.is_machine_readable() && io::stderr().is_terminal();
    if show_progress {
        finder_config = finder_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let root = cli.root();
    let finder = DuplicateFinder::new(finder_config);
    let (groups, summary) = finder
        .find_duplicates(&root)
        .with_context(|| format!("Scan of {} failed", root.display()))?;

    let exit_code = exit_code_for(&groups, &summary);
    let color = !cli.no_color && io::stdout().is_terminal();
    write_report(cli.output, &groups, &summary, exit_code, color)?;

    for error in &summary.scan_errors {
        log::warn!("{}", error);
    }
    log::info!(
        "{} duplicate group(s), {} reclaimable, {} file(s) scanned in {:.2?}",
        summary.duplicate_groups,
        summary.reclaimable_display(),
        summary.total_files,
        summary.scan_duration
    );

    Ok(exit_code)
}

/// Exit code for a completed scan.
#[must_use]
pub fn exit_code_for(groups: &[DuplicateGroup], summary: &ScanSummary) -> ExitCode {
    if summary.has_errors() {
        ExitCode::PartialSuccess
    } else if groups.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}

fn write_report(
    format: OutputFormat,
    groups: &[DuplicateGroup],
    summary: &ScanSummary,
    exit_code: ExitCode,
    color: bool,
) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match format {
        OutputFormat::Text => TextOutput::new(groups, color)
            .write_to(&mut handle)
            .context("Failed to write report")?,
        OutputFormat::Json => JsonOutput::new(groups, summary, exit_code)
            .write_to(&mut handle, true)
            .context("Failed to write JSON report")?,
        OutputFormat::Csv => CsvOutput::new(groups)
            .write_to(&mut handle)
            .context("Failed to write CSV report")?,
    }
    Ok(())
}
