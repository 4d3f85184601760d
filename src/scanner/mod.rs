//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Directory walking using jwalk, skipping a named directory
//! - Content hashing with BLAKE3
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//!
//! # Example
//!
//! ```no_run
//! use twinfind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     min_size: 1024,
//!     ignore_dir: Some(".git".to_string()),
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::ffi::OsString;
use std::path::PathBuf;

pub use hasher::{hash_to_hex, Blake3Hasher, ContentHasher, Hash, HASH_BUFFER_SIZE};
pub use walker::Walker;

/// Default minimum file size, in bytes.
pub const DEFAULT_MIN_SIZE: u64 = 1_000_000;

/// Default directory name excluded from traversal.
pub const DEFAULT_IGNORE_DIR: &str = ".git";

/// Metadata for a discovered file.
///
/// This is the tuple produced by traversal: the path identifies the file,
/// the name and size are the cheap metadata used to pair candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path to the file, unique within a run
    pub path: PathBuf,
    /// Final path component, compared byte for byte
    pub name: OsString,
    /// File size in bytes
    pub size: u64,
}

impl FileEntry {
    /// Create a new FileEntry, deriving the name from the path.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        let name = path.file_name().map(OsString::from).unwrap_or_default();
        Self { path, name, size }
    }

    /// Create a FileEntry with an explicit name.
    #[must_use]
    pub fn with_name(path: PathBuf, name: impl Into<OsString>, size: u64) -> Self {
        Self {
            path,
            name: name.into(),
            size,
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkerConfig {
    /// Minimum file size to include (in bytes).
    /// Files smaller than this are never yielded.
    pub min_size: u64,

    /// Directory name whose subtrees are skipped entirely.
    pub ignore_dir: Option<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            ignore_dir: Some(DEFAULT_IGNORE_DIR.to_string()),
        }
    }
}

impl WalkerConfig {
    /// Create a new configuration.
    ///
    /// An empty `ignore_dir` disables directory skipping.
    #[must_use]
    pub fn new(min_size: u64, ignore_dir: impl Into<String>) -> Self {
        let ignore_dir = ignore_dir.into();
        Self {
            min_size,
            ignore_dir: if ignore_dir.is_empty() {
                None
            } else {
                Some(ignore_dir)
            },
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A file could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl ScanError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::PermissionDenied(path) | Self::NotFound(path) | Self::Io { path, .. } => path,
            Self::Hash(e) => e.path(),
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Path of the file that failed to hash.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) | Self::Io { path, .. } => path,
        }
    }

    /// Classify an I/O error raised while hashing `path`.
    #[must_use]
    pub fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_file_entry_new_derives_name() {
        let entry = FileEntry::new(PathBuf::from("/test/file.txt"), 1024);

        assert_eq!(entry.path, PathBuf::from("/test/file.txt"));
        assert_eq!(entry.name, "file.txt");
        assert_eq!(entry.size, 1024);
    }

    #[test]
    fn test_file_entry_with_name() {
        let entry = FileEntry::with_name(PathBuf::from("/a/b"), "other", 7);
        assert_eq!(entry.name, "other");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_stay_distinct() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let ff = FileEntry::new(PathBuf::from("/d1").join(OsStr::from_bytes(b"\xFF")), 10);
        let fe = FileEntry::new(PathBuf::from("/d2").join(OsStr::from_bytes(b"\xFE")), 10);

        assert_eq!(ff.name.as_encoded_bytes(), b"\xFF");
        assert_ne!(ff.name, fe.name);
    }

    #[test]
    fn test_walker_config_default() {
        let config = WalkerConfig::default();

        assert_eq!(config.min_size, 1_000_000);
        assert_eq!(config.ignore_dir.as_deref(), Some(".git"));
    }

    #[test]
    fn test_walker_config_empty_ignore_disables() {
        let config = WalkerConfig::new(10, "");
        assert_eq!(config.min_size, 10);
        assert!(config.ignore_dir.is_none());
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::PermissionDenied(PathBuf::from("/test"));
        assert_eq!(err.to_string(), "Permission denied: /test");

        let err = ScanError::NotFound(PathBuf::from("/missing"));
        assert_eq!(err.to_string(), "Path not found: /missing");
    }

    #[test]
    fn test_hash_error_from_io() {
        let err = HashError::from_io(
            Path::new("/gone"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert_eq!(err.to_string(), "File not found: /gone");

        let err = HashError::from_io(
            Path::new("/secret"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.to_string(), "Permission denied: /secret");

        let err = HashError::from_io(Path::new("/x"), std::io::Error::other("boom"));
        assert!(matches!(err, HashError::Io { .. }));
    }
}
