//! Directory walker implementation using jwalk.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, the traversal collaborator of
//! the pipeline. It yields one [`FileEntry`] per regular file at or above
//! the configured size threshold, skipping any subtree rooted at a directory
//! with the ignored name. Directory reads happen in parallel inside jwalk,
//! but the resulting iterator is consumed by a single producer.
//!
//! # Features
//!
//! - Ignored directory subtrees are pruned before they are read
//! - Symbolic links are never followed
//! - Hidden files are included
//! - Graceful shutdown via atomic flag
//!
//! # Example
//!
//! ```no_run
//! use twinfind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Downloads"), WalkerConfig::new(1024, ".git"));
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use jwalk::WalkDir;

use super::{FileEntry, ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Whether the root itself carries the ignored name.
    fn root_is_ignored(&self) -> bool {
        match (&self.config.ignore_dir, self.root.file_name()) {
            (Some(ignored), Some(name)) => name == ignored.as_str(),
            _ => false,
        }
    }

    /// Walk the directory tree, yielding file entries.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration. Entries are produced in sorted order within each
    /// directory, but callers must not rely on any particular order.
    pub fn walk(&self) -> Box<dyn Iterator<Item = Result<FileEntry, ScanError>> + '_> {
        if self.root_is_ignored() {
            log::info!("Root {} has the ignored name, nothing to scan", self.root.display());
            return Box::new(std::iter::empty());
        }

        let ignore_dir = self.config.ignore_dir.clone();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .sort(true)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                let Some(ref ignored) = ignore_dir else {
                    return;
                };
                children.retain(|child| match child {
                    Ok(entry) => {
                        let skip =
                            entry.file_type().is_dir() && entry.file_name() == ignored.as_str();
                        if skip {
                            log::debug!("Ignoring directory: {}", entry.path().display());
                        }
                        !skip
                    }
                    Err(_) => true,
                });
            });

        Box::new(walk_dir.into_iter().filter_map(move |entry_result| {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping iteration");
                return None;
            }

            match entry_result {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() || file_type.is_symlink() {
                        return None;
                    }
                    self.process_file_entry(entry.path())
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), std::borrow::ToOwned::to_owned);
                    Some(Err(self.handle_jwalk_error(path, e)))
                }
            }
        }))
    }

    /// Process a file entry and create a FileEntry if it qualifies.
    fn process_file_entry(&self, path: PathBuf) -> Option<Result<FileEntry, ScanError>> {
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => return Some(Err(self.handle_io_error(&path, e))),
        };

        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if size < self.config.min_size {
            log::trace!("Skipping small file ({} bytes): {}", size, path.display());
            return None;
        }

        Some(Ok(FileEntry::new(path, size)))
    }

    /// Handle I/O errors during file access.
    fn handle_io_error(&self, path: &Path, error: std::io::Error) -> ScanError {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path.to_path_buf())
            }
            ErrorKind::NotFound => {
                log::debug!("File not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path.to_path_buf())
            }
            _ => {
                log::warn!("I/O error for {}: {}", path.display(), error);
                ScanError::Io {
                    path: path.to_path_buf(),
                    source: error,
                }
            }
        }
    }

    /// Handle jwalk errors.
    fn handle_jwalk_error(&self, path: PathBuf, error: jwalk::Error) -> ScanError {
        if let Some(io) = error.io_error() {
            if io.kind() == std::io::ErrorKind::PermissionDenied {
                log::warn!("Permission denied: {}", path.display());
                return ScanError::PermissionDenied(path);
            }
        }
        log::warn!("Walker error for {}: {}", path.display(), error);
        ScanError::Io {
            path,
            source: std::io::Error::other(error.to_string()),
        }
    }
}
