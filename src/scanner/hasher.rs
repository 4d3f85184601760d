//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! The pipeline never hashes files directly: it goes through the
//! [`ContentHasher`] trait so that callers (and tests) can substitute their
//! own digest source. [`Blake3Hasher`] is the production implementation and
//! streams file content through a fixed-size buffer, so memory use does not
//! grow with file size.
//!
//! # Example
//!
//! ```no_run
//! use twinfind::scanner::{Blake3Hasher, ContentHasher, hash_to_hex};
//! use std::path::Path;
//!
//! let hasher = Blake3Hasher::new();
//! let hash = hasher.hash_file(Path::new("Cargo.toml")).unwrap();
//! println!("{}", hash_to_hex(&hash));
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use super::HashError;

/// A 32-byte content digest.
pub type Hash = [u8; 32];

/// Read buffer size used while streaming file content (1 MiB).
pub const HASH_BUFFER_SIZE: usize = 1024 * 1024;

/// Source of content digests for files.
///
/// Implementations must be deterministic: the same content must always
/// produce the same digest, and different content must produce different
/// digests with overwhelming probability.
pub trait ContentHasher: Send + Sync {
    /// Compute the digest of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    fn hash_file(&self, path: &Path) -> Result<Hash, HashError>;
}

/// Streaming BLAKE3 hasher.
#[derive(Debug, Clone)]
pub struct Blake3Hasher {
    buffer_size: usize,
}

impl Blake3Hasher {
    /// Create a hasher with the default 1 MiB read buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: HASH_BUFFER_SIZE,
        }
    }

    /// Use a custom read buffer size (minimum 4 KiB).
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(4096);
        self
    }

    /// Hash an in-memory byte slice.
    #[must_use]
    pub fn hash_bytes(data: &[u8]) -> Hash {
        *blake3::hash(data).as_bytes()
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher for Blake3Hasher {
    fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    hasher.update(&buffer[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            }
        }

        let hash = *hasher.finalize().as_bytes();
        log::trace!("{}  {}", hash_to_hex(&hash), path.display());
        Ok(hash)
    }
}

/// Convert a hash to a lowercase hexadecimal string.
///
/// # Example
///
/// ```
/// use twinfind::scanner::hash_to_hex;
///
/// let mut hash = [0u8; 32];
/// hash[0] = 0xab;
/// assert!(hash_to_hex(&hash).starts_with("ab00"));
/// ```
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}
