//! Progress reporting using indicatif.
//!
//! [`Progress`] implements [`ProgressCallback`] with a spinner while the
//! tree is walked and a bar over candidate pairs while hashing. Hashing
//! callbacks arrive concurrently from every worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress callback for the pipeline phases.
///
/// Phases are named `"walking"` and `"hashing"`.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts. `total` is zero when unknown.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Items processed so far in this phase (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a file has been hashed, with its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Terminal progress reporter.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    hashing: Mutex<Option<ProgressBar>>,
    bytes_hashed: AtomicU64,
    quiet: bool,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("quiet", &self.quiet)
            .field("bytes_hashed", &self.bytes_hashed.load(Ordering::Relaxed))
            .finish()
    }
}

impl Progress {
    /// Create a progress reporter drawing to stderr.
    ///
    /// With `quiet` set nothing is drawn.
    ///
    /// ```
    /// use twinfind::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self::with_draw_target(quiet, ProgressDrawTarget::stderr())
    }

    /// Create a progress reporter that draws nowhere, for tests.
    #[must_use]
    pub fn hidden() -> Self {
        Self::with_draw_target(false, ProgressDrawTarget::hidden())
    }

    fn with_draw_target(quiet: bool, target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            walking: Mutex::new(None),
            hashing: Mutex::new(None),
            bytes_hashed: AtomicU64::new(0),
            quiet,
        }
    }

    /// Bytes reported through [`ProgressCallback::on_item_completed`].
    #[must_use]
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed.load(Ordering::Relaxed)
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn hashing_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} pairs ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            "walking" => Some(&self.walking),
            "hashing" => Some(&self.hashing),
            _ => None,
        }
    }

    /// The bar of the phase currently running, hashing first.
    fn active_bar(&self) -> Option<ProgressBar> {
        let hashing = self.hashing.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref pb) = *hashing {
            return Some(pb.clone());
        }
        drop(hashing);
        self.walking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            "walking" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::walking_style());
                pb.set_message("Walking directory");
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            "hashing" => {
                self.bytes_hashed.store(0, Ordering::Relaxed);
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::hashing_style());
                pb.set_message("Hashing");
                pb
            }
            other => {
                log::debug!("Unknown progress phase: {}", other);
                return;
            }
        };

        if let Some(slot) = self.slot(phase) {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active_bar() {
            // Workers report out of order; never move the bar backwards
            if current as u64 > pb.position() {
                pb.set_position(current as u64);
            }
            pb.set_message(truncate_path(path, 30));
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        self.bytes_hashed.fetch_add(bytes, Ordering::Relaxed);
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        let Some(slot) = self.slot(phase) else {
            return;
        };
        if let Some(pb) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let message = match phase {
                "hashing" => format!("Hashed {}", ByteSize(self.bytes_hashed())),
                _ => "Walking complete".to_string(),
            };
            pb.finish_with_message(message);
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        if let Some(pb) = self.active_bar() {
            pb.set_message(message.to_string());
        }
    }
}

/// Shorten a path for display, keeping the file name.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let count = file_name.chars().count();
    if count + 4 > max_len {
        let tail: String = file_name.chars().skip(count + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_path_unchanged() {
        assert_eq!(truncate_path("/a/b.txt", 30), "/a/b.txt");
    }

    #[test]
    fn test_truncate_keeps_file_name() {
        let path = "/very/long/directory/structure/that/goes/on/file.txt";
        assert_eq!(truncate_path(path, 30), ".../file.txt");
    }

    #[test]
    fn test_truncate_long_file_name() {
        let name = "x".repeat(50);
        let truncated = truncate_path(&format!("/d/{}", name), 30);
        assert!(truncated.starts_with("..."));
        assert_eq!(truncated.chars().count(), 30);
    }

    #[test]
    fn test_hidden_progress_tracks_phases() {
        let progress = Progress::hidden();
        progress.on_phase_start("walking", 0);
        progress.on_progress(1, "/a");
        progress.on_phase_end("walking");

        progress.on_phase_start("hashing", 4);
        progress.on_progress(2, "/a");
        progress.on_progress(1, "/b");
        assert_eq!(progress.active_bar().unwrap().position(), 2);

        progress.on_item_completed(100);
        progress.on_item_completed(50);
        assert_eq!(progress.bytes_hashed(), 150);

        progress.on_phase_end("hashing");
        assert!(progress.active_bar().is_none());
    }

    #[test]
    fn test_quiet_progress_draws_nothing() {
        let progress = Progress::new(true);
        progress.on_phase_start("hashing", 10);
        progress.on_progress(3, "/a");
        assert!(progress.active_bar().is_none());
    }

    #[test]
    fn test_unknown_phase_ignored() {
        let progress = Progress::hidden();
        progress.on_phase_start("other", 1);
        progress.on_phase_end("other");
        assert!(progress.active_bar().is_none());
    }
}
