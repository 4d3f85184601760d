//! Candidate pair generation.
//!
//! # Overview
//!
//! Two files can only be identical if their sizes match, and when name
//! matching is enabled their names must match as well. The generator
//! buckets registered records by that metadata key, discards buckets with a
//! single member, and enumerates every unordered pair inside each bucket.
//! This yields exactly the pairs a full quadratic scan with the same filter
//! would produce, without comparing files from different buckets.
//!
//! Pairs are produced lazily and pushed onto the hashing stage's bounded
//! queue, so memory stays flat even when a bucket holds many files.
//!
//! # Example
//!
//! ```
//! use twinfind::duplicates::{CandidateGenerator, FileRegistry};
//! use twinfind::scanner::FileEntry;
//! use std::path::PathBuf;
//!
//! let mut registry = FileRegistry::new();
//! registry.register(FileEntry::new(PathBuf::from("/a/x.bin"), 10)).unwrap();
//! registry.register(FileEntry::new(PathBuf::from("/b/x.bin"), 10)).unwrap();
//! registry.register(FileEntry::new(PathBuf::from("/c/y.bin"), 10)).unwrap();
//!
//! let by_name = CandidateGenerator::new(&registry, true);
//! assert_eq!(by_name.pairs().count(), 1);
//!
//! let by_size = CandidateGenerator::new(&registry, false);
//! assert_eq!(by_size.pairs().count(), 3);
//! ```

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use super::registry::{FileRecord, FileRegistry};

/// Two distinct records selected for content comparison.
#[derive(Debug, Clone)]
pub struct PairCandidate {
    /// First record
    pub a: Arc<FileRecord>,
    /// Second record
    pub b: Arc<FileRecord>,
}

impl PairCandidate {
    /// Create a pair.
    #[must_use]
    pub fn new(a: Arc<FileRecord>, b: Arc<FileRecord>) -> Self {
        debug_assert_ne!(a.path(), b.path(), "a record must never be paired with itself");
        Self { a, b }
    }
}

/// Errors that stop candidate generation early.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CandidateError {
    /// The shutdown flag was raised.
    #[error("Candidate generation interrupted")]
    Interrupted,

    /// The hashing stage stopped accepting pairs.
    #[error("Candidate queue closed after {emitted} pair(s)")]
    QueueClosed {
        /// Pairs emitted before the queue closed
        emitted: u64,
    },
}

/// Statistics from bucketing the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateStats {
    /// Records considered
    pub total_files: usize,
    /// Buckets holding two or more records
    pub buckets: usize,
    /// Records whose metadata key is unique and so can never match
    pub eliminated_unique: usize,
    /// Number of pairs the buckets will produce
    pub candidate_pairs: u64,
}

/// Enumerates candidate pairs from a fully populated registry.
///
/// The registry is bucketed once, when the generator is built; stats,
/// iteration and generation all read the same buckets.
#[derive(Debug)]
pub struct CandidateGenerator {
    buckets: Vec<Vec<Arc<FileRecord>>>,
    stats: CandidateStats,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl CandidateGenerator {
    /// Bucket `registry` by size, and by name when `match_by_name` is set.
    #[must_use]
    pub fn new(registry: &FileRegistry, match_by_name: bool) -> Self {
        let (buckets, stats) = Self::bucket(registry, match_by_name);
        Self {
            buckets,
            stats,
            shutdown_flag: None,
        }
    }

    /// Stop emitting when the flag is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Group records by size (and name) in registration order, keeping
    /// only buckets that can produce a pair. Names compare as raw bytes.
    fn bucket(
        registry: &FileRegistry,
        match_by_name: bool,
    ) -> (Vec<Vec<Arc<FileRecord>>>, CandidateStats) {
        let mut keyed: BTreeMap<(u64, Option<&OsStr>), Vec<Arc<FileRecord>>> = BTreeMap::new();
        for record in registry.records() {
            let name = match_by_name.then(|| record.name());
            keyed
                .entry((record.size(), name))
                .or_default()
                .push(Arc::clone(record));
        }

        let mut stats = CandidateStats {
            total_files: registry.len(),
            ..Default::default()
        };

        let buckets: Vec<Vec<Arc<FileRecord>>> = keyed
            .into_iter()
            .filter_map(|((size, _), records)| {
                if records.len() < 2 {
                    stats.eliminated_unique += records.len();
                    return None;
                }
                let n = records.len() as u64;
                stats.buckets += 1;
                stats.candidate_pairs += n * (n - 1) / 2;
                log::trace!("Bucket of {} files at {} bytes", records.len(), size);
                Some(records)
            })
            .collect();

        (buckets, stats)
    }

    /// Statistics describing the pairs this generator will produce.
    #[must_use]
    pub fn stats(&self) -> CandidateStats {
        self.stats.clone()
    }

    /// Lazily enumerate every candidate pair.
    #[must_use]
    pub fn pairs(&self) -> Pairs<'_> {
        Pairs::new(&self.buckets)
    }

    /// Push every candidate pair onto `sink`, blocking while it is full.
    ///
    /// Returns the number of pairs emitted.
    ///
    /// # Errors
    ///
    /// Returns [`CandidateError::Interrupted`] when the shutdown flag is
    /// raised and [`CandidateError::QueueClosed`] when no consumer is left.
    pub fn generate(&self, sink: &Sender<PairCandidate>) -> Result<u64, CandidateError> {
        log::info!(
            "Generating {} candidate pair(s) from {} bucket(s); {} of {} files have unique metadata",
            self.stats.candidate_pairs,
            self.stats.buckets,
            self.stats.eliminated_unique,
            self.stats.total_files
        );

        let mut emitted = 0u64;
        for pair in self.pairs() {
            if self.is_shutdown_requested() {
                log::debug!("Candidate generation interrupted after {} pair(s)", emitted);
                return Err(CandidateError::Interrupted);
            }
            if sink.send(pair).is_err() {
                return Err(CandidateError::QueueClosed { emitted });
            }
            emitted += 1;
        }

        log::debug!("Candidate generation finished: {} pair(s)", emitted);
        Ok(emitted)
    }
}

/// Iterator over all unordered pairs within each bucket.
#[derive(Debug)]
pub struct Pairs<'a> {
    buckets: &'a [Vec<Arc<FileRecord>>],
    bucket: usize,
    i: usize,
    j: usize,
}

impl<'a> Pairs<'a> {
    fn new(buckets: &'a [Vec<Arc<FileRecord>>]) -> Self {
        Self {
            buckets,
            bucket: 0,
            i: 0,
            j: 1,
        }
    }
}

impl Iterator for Pairs<'_> {
    type Item = PairCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let records = self.buckets.get(self.bucket)?;
            if self.j < records.len() {
                let pair =
                    PairCandidate::new(Arc::clone(&records[self.i]), Arc::clone(&records[self.j]));
                self.j += 1;
                return Some(pair);
            }

            self.i += 1;
            self.j = self.i + 1;
            if self.j >= records.len() {
                self.bucket += 1;
                self.i = 0;
                self.j = 1;
            }
        }
    }
}
