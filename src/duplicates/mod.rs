//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Registering traversal output ([`registry`])
//! - Pairing files with equal size and name ([`candidates`])
//! - Confirming pairs by content hash on a worker pool ([`hashing`])
//! - Merging confirmed pairs into hash groups ([`aggregator`])
//! - Ordering the final report ([`groups`])
//!
//! [`finder`] wires the stages together on top of the bounded
//! [`pool::WorkerPool`].

pub mod aggregator;
pub mod candidates;
pub mod finder;
pub mod groups;
pub mod hashing;
pub mod pool;
pub mod registry;

pub use aggregator::{Group, MatchAggregator};
pub use candidates::{CandidateError, CandidateGenerator, CandidateStats, PairCandidate, Pairs};
pub use finder::{DuplicateFinder, FinderConfig, FinderError, ScanSummary, DEFAULT_WORKER_COUNT};
pub use groups::{finalize, sort_groups, DuplicateGroup};
pub use hashing::{ConfirmedMatch, HashStats, HashWorkerReport, HashingStage};
pub use pool::{PoolError, WorkerPool, DEFAULT_QUEUE_CAPACITY};
pub use registry::{FileRecord, FileRegistry, RegistryError};
