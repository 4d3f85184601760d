//! Command-line interface definitions for twinfind.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates of 1MB or more under the current directory
//! twinfind
//!
//! # Match by size and content only, ignoring file names
//! twinfind ~/Downloads --no-name
//!
//! # Smaller threshold, JSON output
//! twinfind ~/Pictures --min-size 100KiB --output json
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Find duplicate files by size, name and content hash.
///
/// Files of equal size (and, unless --no-name is given, equal name) are
/// compared by BLAKE3 hash on a pool of worker threads.
#[derive(Debug, Parser)]
#[command(name = "twinfind")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Directory to scan (default: current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Minimum file size to consider (e.g., 1MB, 500KiB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Directory name to skip, with its whole subtree (empty to disable)
    #[arg(long = "ignore", value_name = "NAME")]
    pub ignore_dir: Option<String>,

    /// Do not require matching file names; compare by size and content only
    #[arg(long)]
    pub no_name: bool,

    /// Number of hashing workers
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Capacity of each internal work queue
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Load settings from this TOML file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

impl Cli {
    /// The scan root, defaulting to the current directory.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One header line per group followed by the other copies
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl OutputFormat {
    /// Whether the format is meant for other programs rather than people.
    #[must_use]
    pub fn is_machine_readable(self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes B, K/KB, KiB, M/MB, MiB, G/GB, GiB, T/TB, TiB,
/// case-insensitively. A bare number is a byte count.
///
/// ```
/// use twinfind::cli::parse_size;
///
/// assert_eq!(parse_size("1000000").unwrap(), 1_000_000);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// assert_eq!(parse_size("1.5K").unwrap(), 1_500);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, the number is invalid or
/// negative, or the suffix is unknown.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);
    let suffix = suffix.trim().to_ascii_uppercase();

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "K" | "KB" => 1_000,
        "KIB" => 1 << 10,
        "M" | "MB" => 1_000_000,
        "MIB" => 1 << 20,
        "G" | "GB" => 1_000_000_000,
        "GIB" => 1 << 30,
        "T" | "TB" => 1_000_000_000_000,
        "TIB" => 1 << 40,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    // Whole numbers skip the float path so large byte counts stay exact
    if let Ok(whole) = number.parse::<u64>() {
        return whole
            .checked_mul(multiplier)
            .ok_or_else(|| format!("Size too large: '{s}'"));
    }

    let value: f64 = number
        .parse()
        .map_err(|_| format!("Invalid number: '{number}'"))?;
    Ok((value * multiplier as f64) as u64)
}
