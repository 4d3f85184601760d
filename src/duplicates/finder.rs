//! Duplicate finder pipeline orchestrator.
//!
//! # Overview
//!
//! This module wires the stages together:
//! 1. **Walk** - a single producer fills the [`FileRegistry`]
//! 2. **Candidates** - same-size (and same-name) pairs are pushed onto the
//!    hashing queue
//! 3. **Hashing** - `worker_count` workers confirm pairs by content digest
//! 4. **Aggregation** - one worker merges confirmed pairs into hash groups
//! 5. **Finalize** - groups are put into their canonical order
//!
//! Stages communicate only through bounded queues. Shutdown runs front to
//! back: once generation is done the hashing pool is closed and joined,
//! which drops the last sender of the aggregation queue, and then the
//! aggregation pool is joined and hands back its map.
//!
//! # Example
//!
//! ```no_run
//! use twinfind::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let config = FinderConfig::default().with_worker_count(8);
//! let finder = DuplicateFinder::new(config);
//!
//! let (groups, summary) = finder.find_duplicates(Path::new("/some/path")).unwrap();
//! println!("Found {} duplicate groups", summary.duplicate_groups);
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use crossbeam_channel::Receiver;

use super::aggregator::MatchAggregator;
use super::candidates::{CandidateError, CandidateGenerator, PairCandidate};
use super::groups::{finalize, DuplicateGroup};
use super::hashing::{HashStats, HashingStage};
use super::pool::{PoolError, WorkerPool, DEFAULT_QUEUE_CAPACITY};
use super::registry::{FileRegistry, RegistryError};
use crate::progress::ProgressCallback;
use crate::scanner::{Blake3Hasher, ContentHasher, FileEntry, ScanError, Walker, WalkerConfig};

/// Default number of hashing workers.
pub const DEFAULT_WORKER_COUNT: usize = 16;

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of hashing workers.
    pub worker_count: usize,
    /// Capacity of each bounded stage queue.
    pub queue_capacity: usize,
    /// Require equal file names in addition to equal sizes.
    pub match_by_name: bool,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Content hasher shared by the hashing workers.
    pub hasher: Arc<dyn ContentHasher>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("worker_count", &self.worker_count)
            .field("queue_capacity", &self.queue_capacity)
            .field("match_by_name", &self.match_by_name)
            .field("walker_config", &self.walker_config)
            .field("hasher", &"<hasher>")
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            match_by_name: true,
            walker_config: WalkerConfig::default(),
            hasher: Arc::new(Blake3Hasher::new()),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the number of hashing workers (at least one).
    #[must_use]
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    /// Set the capacity of the stage queues (at least one).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Enable or disable name matching.
    #[must_use]
    pub fn with_match_by_name(mut self, enabled: bool) -> Self {
        self.match_by_name = enabled;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Replace the content hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Files registered after size filtering
    pub total_files: usize,
    /// Total size of registered files in bytes
    pub total_size: u64,
    /// Files whose size (and name) matched no other file
    pub eliminated_unique: usize,
    /// Candidate pairs handed to the hashing stage
    pub candidate_pairs: u64,
    /// Hash computations performed
    pub hashes_computed: u64,
    /// Bytes read while hashing
    pub bytes_hashed: u64,
    /// Failed hash attempts; a file is retried by each pair it is in
    pub hash_failures: u64,
    /// Pairs whose digests matched
    pub confirmed_matches: u64,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding representatives)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Non-fatal errors encountered during the scan
    pub scan_errors: Vec<ScanError>,
}

impl ScanSummary {
    /// Calculate the percentage of space that is wasted by duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.total_size).to_string()
    }

    /// Whether any non-fatal error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.scan_errors.is_empty()
    }

    fn record_hash_stats(&mut self, stats: &HashStats) {
        self.hashes_computed = stats.hashes_computed;
        self.bytes_hashed = stats.bytes_hashed;
        self.hash_failures = stats.hash_failures;
        self.confirmed_matches = stats.confirmed_matches;
    }

    fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        self.duplicate_groups = groups.len();
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Traversal produced the same path twice.
    #[error("Path registered twice: {0}")]
    DuplicatePath(PathBuf),

    /// A pipeline worker panicked.
    #[error("{count} worker(s) in the {stage} stage panicked")]
    WorkerPanicked {
        /// Stage whose pool reported the panic
        stage: String,
        /// Number of panicked workers
        count: usize,
    },

    /// A pipeline stage could not be started or stopped accepting work.
    #[error(transparent)]
    Pool(PoolError),
}

impl From<RegistryError> for FinderError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::DuplicatePath(path) => Self::DuplicatePath(path),
        }
    }
}

impl From<PoolError> for FinderError {
    fn from(error: PoolError) -> Self {
        match error {
            PoolError::WorkerPanicked { name, count } => Self::WorkerPanicked { stage: name, count },
            other => Self::Pool(other),
        }
    }
}

/// Duplicate finder that runs the walk → pair → hash → aggregate pipeline.
///
/// # Example
///
/// ```no_run
/// use twinfind::duplicates::DuplicateFinder;
/// use std::path::Path;
///
/// let finder = DuplicateFinder::with_defaults();
/// match finder.find_duplicates(Path::new(".")) {
///     Ok((groups, summary)) => {
///         println!("Found {} duplicate groups", groups.len());
///         println!("Can reclaim {}", summary.reclaimable_display());
///     }
///     Err(e) => eprintln!("Scan failed: {}", e),
/// }
/// ```
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The finder's configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Find all duplicate files below `path`.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if:
    /// - The path does not exist or is not a directory
    /// - Traversal yields the same path twice
    /// - The scan is interrupted by shutdown signal
    /// - A pipeline worker panics
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();

        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }

        log::info!("Starting duplicate scan of {}", path.display());

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let mut summary = ScanSummary::default();
        let registry = self.collect(path, &mut summary)?;

        let groups = self.run_pipeline(registry, &mut summary)?;
        summary.scan_duration = start_time.elapsed();
        Ok((groups, summary))
    }

    /// Find duplicates among a pre-collected list of files.
    ///
    /// # Errors
    ///
    /// Same as [`find_duplicates`](Self::find_duplicates), minus the root
    /// validation.
    pub fn find_duplicates_from_files(
        &self,
        files: Vec<FileEntry>,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut registry = FileRegistry::new();
        registry.extend(files)?;

        let mut summary = ScanSummary::default();
        let groups = self.run_pipeline(registry, &mut summary)?;
        summary.scan_duration = start_time.elapsed();
        Ok((groups, summary))
    }

    /// Walk `path` and register every qualifying file.
    fn collect(&self, path: &Path, summary: &mut ScanSummary) -> Result<FileRegistry, FinderError> {
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
            callback.on_message(&format!("Walking {}", path.display()));
        }

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        let mut registry = FileRegistry::new();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    let record = registry.register(file)?;
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_progress(registry.len(), &record.path().to_string_lossy());
                    }
                }
                Err(e) => summary.scan_errors.push(e),
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!(
            "Registered {} files ({})",
            registry.len(),
            ByteSize(registry.total_size())
        );
        Ok(registry)
    }

    /// Run the pairing, hashing and aggregation stages over a filled
    /// registry and finalize the groups.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] if the shutdown flag is raised
    /// and [`FinderError::WorkerPanicked`] if a stage worker panics. Both
    /// pools are always drained and joined before returning.
    pub fn run_pipeline(
        &self,
        registry: FileRegistry,
        summary: &mut ScanSummary,
    ) -> Result<Vec<DuplicateGroup>, FinderError> {
        summary.total_files = registry.len();
        summary.total_size = registry.total_size();

        let mut generator = CandidateGenerator::new(&registry, self.config.match_by_name);
        if let Some(ref flag) = self.config.shutdown_flag {
            generator = generator.with_shutdown_flag(Arc::clone(flag));
        }
        let stats = generator.stats();
        summary.eliminated_unique = stats.eliminated_unique;

        if stats.candidate_pairs == 0 {
            log::info!("No files share size and name, nothing to hash");
            return Ok(Vec::new());
        }

        let capacity = self.config.queue_capacity;
        let aggregate_pool = WorkerPool::spawn("aggregate", 1, capacity, MatchAggregator::aggregate)?;

        let stage = HashingStage::new(Arc::clone(&self.config.hasher), aggregate_pool.sender())
            .with_progress_callback(self.config.progress_callback.clone());
        let hash_pool = match WorkerPool::spawn(
            "hash",
            self.config.worker_count,
            capacity,
            move |rx: Receiver<PairCandidate>| stage.run_worker(rx),
        ) {
            Ok(pool) => pool,
            Err(err) => return Err(aggregate_pool.abandon(err).into()),
        };

        log::info!(
            "Hashing with {} worker(s), queue capacity {}",
            hash_pool.workers(),
            capacity
        );
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("hashing", stats.candidate_pairs as usize);
        }

        let sender = hash_pool.sender();
        let generated = generator.generate(&sender);
        drop(sender);

        // Drain front to back: the hashing workers hold the last senders of
        // the aggregation queue.
        let reports = hash_pool.shutdown();
        let aggregators = aggregate_pool.shutdown();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("hashing");
        }

        let reports = reports?;
        let aggregator = aggregators?.into_iter().next().unwrap_or_default();

        // A file that fails is retried by each later pair; report it once.
        let mut hash_stats = HashStats::default();
        let mut failed = HashSet::new();
        for report in reports {
            hash_stats.merge(&report.stats);
            for error in report.errors {
                if failed.insert(error.path().to_path_buf()) {
                    summary.scan_errors.push(ScanError::from(error));
                }
            }
        }
        summary.record_hash_stats(&hash_stats);

        match generated {
            Ok(emitted) => summary.candidate_pairs = emitted,
            Err(CandidateError::Interrupted) => return Err(FinderError::Interrupted),
            Err(CandidateError::QueueClosed { emitted }) => {
                log::error!("Hashing stage closed after {} pair(s)", emitted);
                return Err(PoolError::Closed("hash".to_string()).into());
            }
        }

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let groups = finalize(aggregator);
        summary.record_groups(&groups);

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Hash, HashError};
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory hasher that counts calls per path.
    #[derive(Default)]
    struct CountingHasher {
        contents: HashMap<PathBuf, Vec<u8>>,
        calls: Mutex<HashMap<PathBuf, usize>>,
    }

    impl CountingHasher {
        fn with_files(files: &[(&str, &[u8])]) -> Self {
            Self {
                contents: files
                    .iter()
                    .map(|(p, c)| (PathBuf::from(p), c.to_vec()))
                    .collect(),
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn entries(&self) -> Vec<FileEntry> {
            let mut entries: Vec<FileEntry> = self
                .contents
                .iter()
                .map(|(p, c)| FileEntry::new(p.clone(), c.len() as u64))
                .collect();
            entries.sort_by(|a, b| a.path.cmp(&b.path));
            entries
        }
    }

    impl ContentHasher for CountingHasher {
        fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(path.to_path_buf())
                .or_default() += 1;
            self.contents
                .get(path)
                .map(|c| Blake3Hasher::hash_bytes(c))
                .ok_or_else(|| HashError::NotFound(path.to_path_buf()))
        }
    }

    fn finder(hasher: Arc<CountingHasher>) -> DuplicateFinder {
        DuplicateFinder::new(
            FinderConfig::default()
                .with_worker_count(4)
                .with_queue_capacity(2)
                .with_hasher(hasher),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = FinderConfig::default();
        assert_eq!(config.worker_count, 16);
        assert_eq!(config.queue_capacity, 512);
        assert!(config.match_by_name);
        assert_eq!(config.walker_config.min_size, 1_000_000);
    }

    #[test]
    fn test_config_clamps_zero() {
        let config = FinderConfig::default()
            .with_worker_count(0)
            .with_queue_capacity(0);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.queue_capacity, 1);
    }

    #[test]
    fn test_path_not_found() {
        let result = DuplicateFinder::with_defaults().find_duplicates(Path::new("/no/such/dir/here"));
        assert!(matches!(result, Err(FinderError::PathNotFound(_))));
    }

    #[test]
    fn test_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, b"x").unwrap();

        let result = DuplicateFinder::with_defaults().find_duplicates(&file);
        assert!(matches!(result, Err(FinderError::NotADirectory(_))));
    }

    #[test]
    fn test_every_record_hashed_at_most_once() {
        let hasher = Arc::new(CountingHasher::with_files(&[
            ("/a/same", b"0123456789"),
            ("/b/same", b"0123456789"),
            ("/c/same", b"0123456789"),
            ("/d/same", b"9876543210"),
            ("/e/same", b"0123456789"),
        ]));
        let (groups, summary) = finder(Arc::clone(&hasher))
            .find_duplicates_from_files(hasher.entries())
            .unwrap();

        assert_eq!(summary.candidate_pairs, 10);
        assert_eq!(summary.hashes_computed, 5);
        assert!(hasher.calls.lock().unwrap().values().all(|&n| n == 1));

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 4);
        assert_eq!(summary.duplicate_files, 3);
        assert_eq!(summary.reclaimable_space, 30);
    }

    #[test]
    fn test_unreadable_file_is_non_fatal() {
        let hasher = Arc::new(CountingHasher::with_files(&[
            ("/a/f", b"abc"),
            ("/b/f", b"abc"),
        ]));
        let mut files = hasher.entries();
        files.push(FileEntry::new(PathBuf::from("/gone/f"), 3));

        let (groups, summary) = finder(Arc::clone(&hasher))
            .find_duplicates_from_files(files)
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert!(summary.hash_failures >= 1);
        assert!(summary.has_errors());
        assert_eq!(summary.scan_errors.len(), 1);
        assert_eq!(summary.scan_errors[0].path(), Path::new("/gone/f"));
    }

    #[test]
    fn test_duplicate_path_is_fatal() {
        let files = vec![
            FileEntry::new(PathBuf::from("/a/f"), 3),
            FileEntry::new(PathBuf::from("/a/f"), 3),
        ];
        let result = DuplicateFinder::with_defaults().find_duplicates_from_files(files);
        assert!(matches!(result, Err(FinderError::DuplicatePath(p)) if p == Path::new("/a/f")));
    }

    #[test]
    fn test_shutdown_flag_interrupts() {
        let hasher = Arc::new(CountingHasher::with_files(&[
            ("/a/f", b"abc"),
            ("/b/f", b"abc"),
        ]));
        let flag = Arc::new(AtomicBool::new(true));
        let finder = DuplicateFinder::new(
            FinderConfig::default()
                .with_hasher(Arc::clone(&hasher) as Arc<dyn ContentHasher>)
                .with_shutdown_flag(flag),
        );

        let result = finder.find_duplicates_from_files(hasher.entries());
        assert!(matches!(result, Err(FinderError::Interrupted)));
    }

    #[test]
    fn test_no_candidates_skips_hashing() {
        let hasher = Arc::new(CountingHasher::with_files(&[
            ("/a/one", b"abc"),
            ("/b/two", b"abc"),
        ]));
        let (groups, summary) = finder(Arc::clone(&hasher))
            .find_duplicates_from_files(hasher.entries())
            .unwrap();

        assert!(groups.is_empty());
        assert_eq!(summary.eliminated_unique, 2);
        assert!(hasher.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_find_duplicates_on_disk() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/data.bin"), vec![1u8; 4096]).unwrap();
        fs::write(dir.path().join("b/data.bin"), vec![1u8; 4096]).unwrap();

        let finder = DuplicateFinder::new(
            FinderConfig::default().with_walker_config(WalkerConfig::new(1, ".git")),
        );
        let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

        assert_eq!(summary.total_files, 2);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].size, 4096);
        assert!(groups[0].files[0].path.ends_with("a/data.bin"));
    }

    #[test]
    fn test_summary_helpers() {
        let summary = ScanSummary {
            total_size: 1000,
            reclaimable_space: 250,
            ..Default::default()
        };
        assert!((summary.wasted_percentage() - 25.0).abs() < f64::EPSILON);
        assert!(!summary.has_errors());
        assert_eq!(ScanSummary::default().wasted_percentage(), 0.0);
    }
}
