//! File registry and per-record hash memoization.
//!
//! # Overview
//!
//! The registry is filled by a single producer (the traversal) and then
//! handed to the candidate generator. Each registered file becomes a shared
//! [`FileRecord`] whose content hash starts out empty and is filled in place
//! by the first hashing worker that computes it.
//!
//! Many candidate pairs can reference the same record, so several workers
//! may ask for the same hash at the same time. The hash slot is guarded by a
//! per-record mutex that is held for the whole computation: the first
//! worker computes, the others block on the lock and then reuse the stored
//! digest. A failed computation leaves the slot empty, so a later pair may
//! try again.
//!
//! # Example
//!
//! ```
//! use twinfind::duplicates::FileRegistry;
//! use twinfind::scanner::FileEntry;
//! use std::path::PathBuf;
//!
//! let mut registry = FileRegistry::new();
//! registry.register(FileEntry::new(PathBuf::from("/a/1.txt"), 10)).unwrap();
//! assert!(registry.register(FileEntry::new(PathBuf::from("/a/1.txt"), 10)).is_err());
//! assert_eq!(registry.len(), 1);
//! ```

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::scanner::{ContentHasher, FileEntry, Hash, HashError};

/// A registered file and its lazily computed content hash.
#[derive(Debug)]
pub struct FileRecord {
    path: PathBuf,
    name: OsString,
    size: u64,
    hash: Mutex<Option<Hash>>,
}

impl FileRecord {
    /// Create a record with an empty hash slot.
    #[must_use]
    pub fn new(entry: FileEntry) -> Self {
        Self {
            path: entry.path,
            name: entry.name,
            size: entry.size,
            hash: Mutex::new(None),
        }
    }

    /// Path of the file; unique within a registry.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used for name matching.
    #[must_use]
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// File size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The memoized hash, if it has been computed.
    #[must_use]
    pub fn hash(&self) -> Option<Hash> {
        *self.hash.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the memoized hash, computing it first if necessary.
    ///
    /// The slot lock is held while `hasher` runs, so concurrent callers for
    /// the same record wait for the in-flight computation instead of
    /// starting their own. The returned flag is `true` when this call
    /// performed the computation.
    ///
    /// # Errors
    ///
    /// Returns the hasher's error; the slot stays empty in that case.
    pub fn ensure_hash(&self, hasher: &dyn ContentHasher) -> Result<(Hash, bool), HashError> {
        let mut slot = self.hash.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hash) = *slot {
            return Ok((hash, false));
        }

        let hash = hasher.hash_file(&self.path)?;
        *slot = Some(hash);
        Ok((hash, true))
    }

    /// Convert back into the plain traversal entry.
    #[must_use]
    pub fn to_entry(&self) -> FileEntry {
        FileEntry::with_name(self.path.clone(), self.name.clone(), self.size)
    }
}

/// Errors raised while registering traversal output.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    /// The same path was produced twice; traversal broke its contract.
    #[error("Path registered twice: {0}")]
    DuplicatePath(PathBuf),
}

/// In-memory collection of registered files.
///
/// Owned by the single traversal producer while it is being filled, then
/// read-only. Records are shared with pipeline stages through `Arc`.
#[derive(Debug, Default)]
pub struct FileRegistry {
    records: Vec<Arc<FileRecord>>,
    paths: HashSet<PathBuf>,
}

impl FileRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one traversal entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePath`] if the path is already
    /// registered. The registry is left unchanged.
    pub fn register(&mut self, entry: FileEntry) -> Result<Arc<FileRecord>, RegistryError> {
        if !self.paths.insert(entry.path.clone()) {
            log::error!("Path registered twice: {}", entry.path.display());
            return Err(RegistryError::DuplicatePath(entry.path));
        }

        log::trace!("Registered {} ({} bytes)", entry.path.display(), entry.size);
        let record = Arc::new(FileRecord::new(entry));
        self.records.push(Arc::clone(&record));
        Ok(record)
    }

    /// Register every entry of an iterator, stopping at the first duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicatePath`] on the first repeated path.
    pub fn extend<I>(&mut self, entries: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = FileEntry>,
    {
        for entry in entries {
            self.register(entry)?;
        }
        Ok(())
    }

    /// Registered records in registration order.
    #[must_use]
    pub fn records(&self) -> &[Arc<FileRecord>] {
        &self.records
    }

    /// Number of registered files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total size of all registered files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    struct SlowCountingHasher {
        calls: AtomicUsize,
    }

    impl ContentHasher for SlowCountingHasher {
        fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(crate::scanner::Blake3Hasher::hash_bytes(
                path.as_os_str().to_string_lossy().as_bytes(),
            ))
        }
    }

    struct FailingHasher {
        calls: AtomicUsize,
    }

    impl ContentHasher for FailingHasher {
        fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(HashError::NotFound(path.to_path_buf()))
        }
    }

    fn entry(path: &str, size: u64) -> FileEntry {
        FileEntry::new(PathBuf::from(path), size)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = FileRegistry::new();
        assert!(registry.is_empty());

        let record = registry.register(entry("/x/a.bin", 100)).unwrap();
        registry.register(entry("/x/b.bin", 50)).unwrap();

        assert_eq!(record.name(), "a.bin");
        assert_eq!(record.size(), 100);
        assert!(record.hash().is_none());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.total_size(), 150);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut registry = FileRegistry::new();
        registry.register(entry("/x/a.bin", 100)).unwrap();

        let err = registry.register(entry("/x/a.bin", 100)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePath(ref p) if p == Path::new("/x/a.bin")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_extend_stops_at_duplicate() {
        let mut registry = FileRegistry::new();
        let result = registry.extend(vec![
            entry("/a", 1),
            entry("/b", 1),
            entry("/a", 1),
            entry("/c", 1),
        ]);

        assert!(result.is_err());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_ensure_hash_memoizes() {
        let record = FileRecord::new(entry("/x/a.bin", 1));
        let hasher = SlowCountingHasher {
            calls: AtomicUsize::new(0),
        };

        let (first, computed) = record.ensure_hash(&hasher).unwrap();
        assert!(computed);
        let (second, computed) = record.ensure_hash(&hasher).unwrap();
        assert!(!computed);

        assert_eq!(first, second);
        assert_eq!(record.hash(), Some(first));
        assert_eq!(hasher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ensure_hash_concurrent_callers_compute_once() {
        let record = Arc::new(FileRecord::new(entry("/x/shared.bin", 1)));
        let hasher = Arc::new(SlowCountingHasher {
            calls: AtomicUsize::new(0),
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let record = Arc::clone(&record);
                let hasher = Arc::clone(&hasher);
                thread::spawn(move || record.ensure_hash(hasher.as_ref()).unwrap().0)
            })
            .collect();

        let hashes: Vec<Hash> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(hasher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ensure_hash_failure_leaves_slot_empty() {
        let record = FileRecord::new(entry("/x/gone.bin", 1));
        let hasher = FailingHasher {
            calls: AtomicUsize::new(0),
        };

        assert!(record.ensure_hash(&hasher).is_err());
        assert!(record.hash().is_none());

        // A later caller may try again
        assert!(record.ensure_hash(&hasher).is_err());
        assert_eq!(hasher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_to_entry_round_trips_metadata() {
        let original = FileEntry::with_name(PathBuf::from("/p/q"), "custom", 9);
        let record = FileRecord::new(original.clone());
        assert_eq!(record.to_entry(), original);
    }
}
