//! Hashing stage: confirms candidate pairs by content digest.
//!
//! Each worker drains the candidate queue. For every pair it makes sure both
//! records carry a memoized hash (see [`FileRecord::ensure_hash`]), compares
//! the raw digests and forwards equal pairs to the aggregation queue.
//! Failures to read a file are logged and the pair is dropped; they never
//! stop the stage.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use super::candidates::PairCandidate;
use super::registry::FileRecord;
use crate::progress::ProgressCallback;
use crate::scanner::{ContentHasher, Hash, HashError};

/// Threshold for logging large files.
const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024; // 100MB

/// A candidate pair whose digests are byte-equal.
#[derive(Debug, Clone)]
pub struct ConfirmedMatch {
    /// First record
    pub a: Arc<FileRecord>,
    /// Second record
    pub b: Arc<FileRecord>,
    /// The shared digest
    pub hash: Hash,
}

/// Counters collected by one hashing worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashStats {
    /// Pairs taken off the candidate queue
    pub pairs_processed: u64,
    /// Hash computations performed by this worker
    pub hashes_computed: u64,
    /// Bytes read while computing those hashes
    pub bytes_hashed: u64,
    /// Failed hash computations
    pub hash_failures: u64,
    /// Pairs dropped because a side could not be hashed
    pub dropped_pairs: u64,
    /// Pairs forwarded as confirmed matches
    pub confirmed_matches: u64,
}

impl HashStats {
    /// Add another worker's counters to this one.
    pub fn merge(&mut self, other: &HashStats) {
        self.pairs_processed += other.pairs_processed;
        self.hashes_computed += other.hashes_computed;
        self.bytes_hashed += other.bytes_hashed;
        self.hash_failures += other.hash_failures;
        self.dropped_pairs += other.dropped_pairs;
        self.confirmed_matches += other.confirmed_matches;
    }
}

/// Result returned by a hashing worker when its queue closes.
#[derive(Debug, Default)]
pub struct HashWorkerReport {
    /// Worker counters
    pub stats: HashStats,
    /// Hash failures observed by the worker
    pub errors: Vec<HashError>,
}

/// Shared state for the hashing workers.
#[derive(Clone)]
pub struct HashingStage {
    hasher: Arc<dyn ContentHasher>,
    matches: Sender<ConfirmedMatch>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    processed: Arc<AtomicUsize>,
}

impl std::fmt::Debug for HashingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashingStage")
            .field("hasher", &"<hasher>")
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .field("processed", &self.processed.load(Ordering::Relaxed))
            .finish()
    }
}

impl HashingStage {
    /// Create the stage, forwarding confirmed matches to `matches`.
    #[must_use]
    pub fn new(hasher: Arc<dyn ContentHasher>, matches: Sender<ConfirmedMatch>) -> Self {
        Self {
            hasher,
            matches,
            progress_callback: None,
            processed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report one progress tick per processed pair.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Option<Arc<dyn ProgressCallback>>) -> Self {
        self.progress_callback = callback;
        self
    }

    /// Worker body: drain `pairs` until the queue closes.
    pub fn run_worker(&self, pairs: Receiver<PairCandidate>) -> HashWorkerReport {
        let mut report = HashWorkerReport::default();

        for pair in pairs.iter() {
            report.stats.pairs_processed += 1;
            let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(current, pair.a.path().to_string_lossy().as_ref());
            }

            let hash_a = self.resolve(&pair.a, &mut report);
            let hash_b = self.resolve(&pair.b, &mut report);
            let (Some(hash_a), Some(hash_b)) = (hash_a, hash_b) else {
                report.stats.dropped_pairs += 1;
                continue;
            };

            if hash_a != hash_b {
                continue;
            }

            log::trace!(
                "Match: {} == {}",
                pair.a.path().display(),
                pair.b.path().display()
            );
            let confirmed = ConfirmedMatch {
                a: pair.a,
                b: pair.b,
                hash: hash_a,
            };
            if self.matches.send(confirmed).is_err() {
                log::error!("Aggregation queue closed, hashing worker stopping");
                break;
            }
            report.stats.confirmed_matches += 1;
        }

        report
    }

    /// Memoized hash of `record`, or `None` if it cannot be computed.
    fn resolve(&self, record: &FileRecord, report: &mut HashWorkerReport) -> Option<Hash> {
        if record.size() > LARGE_FILE_THRESHOLD && record.hash().is_none() {
            log::debug!(
                "Hashing large file ({} MB): {}",
                record.size() / (1024 * 1024),
                record.path().display()
            );
        }

        match record.ensure_hash(self.hasher.as_ref()) {
            Ok((hash, computed)) => {
                if computed {
                    report.stats.hashes_computed += 1;
                    report.stats.bytes_hashed += record.size();
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_item_completed(record.size());
                    }
                }
                Some(hash)
            }
            Err(e) => {
                log::warn!("Failed to hash {}: {}", record.path().display(), e);
                report.stats.hash_failures += 1;
                report.errors.push(e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duplicates::FileRegistry;
    use crate::scanner::{Blake3Hasher, FileEntry};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    /// Hashes a fixed content table instead of reading the filesystem.
    struct TableHasher {
        contents: HashMap<PathBuf, &'static [u8]>,
    }

    impl ContentHasher for TableHasher {
        fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
            self.contents
                .get(path)
                .map(|data| Blake3Hasher::hash_bytes(data))
                .ok_or_else(|| HashError::NotFound(path.to_path_buf()))
        }
    }

    fn setup(files: &[(&str, &'static [u8])]) -> (FileRegistry, Arc<TableHasher>) {
        let mut registry = FileRegistry::new();
        let mut contents = HashMap::new();
        for (path, data) in files {
            registry
                .register(FileEntry::new(PathBuf::from(path), data.len() as u64))
                .unwrap();
            contents.insert(PathBuf::from(path), *data);
        }
        (registry, Arc::new(TableHasher { contents }))
    }

    fn run(
        registry: &FileRegistry,
        hasher: Arc<TableHasher>,
        pairs: &[(usize, usize)],
    ) -> (HashWorkerReport, Vec<ConfirmedMatch>) {
        let (match_tx, match_rx) = crossbeam_channel::unbounded();
        let (pair_tx, pair_rx) = crossbeam_channel::unbounded();
        let records = registry.records();
        for &(i, j) in pairs {
            pair_tx
                .send(PairCandidate::new(
                    Arc::clone(&records[i]),
                    Arc::clone(&records[j]),
                ))
                .unwrap();
        }
        drop(pair_tx);

        let stage = HashingStage::new(hasher, match_tx);
        let report = stage.run_worker(pair_rx);
        drop(stage);
        (report, match_rx.iter().collect())
    }

    #[test]
    fn test_equal_content_is_forwarded() {
        let (registry, hasher) = setup(&[("/a/f", b"same"), ("/b/f", b"same")]);
        let (report, matches) = run(&registry, hasher, &[(0, 1)]);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].hash, Blake3Hasher::hash_bytes(b"same"));
        assert_eq!(report.stats.confirmed_matches, 1);
        assert_eq!(report.stats.hashes_computed, 2);
        assert_eq!(report.stats.bytes_hashed, 8);
    }

    #[test]
    fn test_different_content_is_dropped_silently() {
        let (registry, hasher) = setup(&[("/a/f", b"left"), ("/b/f", b"rite")]);
        let (report, matches) = run(&registry, hasher, &[(0, 1)]);

        assert!(matches.is_empty());
        assert_eq!(report.stats.pairs_processed, 1);
        assert_eq!(report.stats.dropped_pairs, 0);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_hash_failure_drops_pair_without_stopping() {
        let (mut registry, hasher) = setup(&[("/a/f", b"data"), ("/b/f", b"data")]);
        registry
            .register(FileEntry::new(PathBuf::from("/missing/f"), 4))
            .unwrap();

        let (report, matches) = run(&registry, hasher, &[(0, 2), (1, 2), (0, 1)]);

        assert_eq!(matches.len(), 1);
        assert_eq!(report.stats.dropped_pairs, 2);
        // The unreadable record is retried by the second pair
        assert_eq!(report.stats.hash_failures, 2);
        assert_eq!(report.errors.len(), 2);
        assert!(registry.records()[2].hash().is_none());
    }

    #[test]
    fn test_hashes_are_memoized_across_pairs() {
        let (registry, hasher) = setup(&[("/a/f", b"x"), ("/b/f", b"x"), ("/c/f", b"x")]);
        let (report, matches) = run(&registry, hasher, &[(0, 1), (0, 2), (1, 2)]);

        assert_eq!(matches.len(), 3);
        assert_eq!(report.stats.hashes_computed, 3);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = HashStats {
            pairs_processed: 1,
            hashes_computed: 2,
            ..Default::default()
        };
        total.merge(&HashStats {
            pairs_processed: 3,
            confirmed_matches: 1,
            ..Default::default()
        });

        assert_eq!(total.pairs_processed, 4);
        assert_eq!(total.hashes_computed, 2);
        assert_eq!(total.confirmed_matches, 1);
    }
}
