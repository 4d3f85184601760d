//! Finalized duplicate groups.
//!
//! # Overview
//!
//! Once every stage has drained, [`finalize`] turns the aggregator's hash
//! map into an ordered report:
//!
//! - within a group, members are ordered by path length (shortest first),
//!   ties broken by path string order; the first member is the representative
//! - groups are ordered by representative size (largest first), ties broken
//!   by hash hex
//!
//! The ordering depends only on the set of groups, never on the order in
//! which matches arrived, so repeated runs over the same files produce the
//! same report.
//!
//! # Example
//!
//! ```
//! use twinfind::duplicates::DuplicateGroup;
//! use twinfind::scanner::FileEntry;
//! use std::path::PathBuf;
//!
//! let group = DuplicateGroup::new(
//!     [0u8; 32],
//!     1024,
//!     vec![
//!         FileEntry::new(PathBuf::from("/a/copy.bin"), 1024),
//!         FileEntry::new(PathBuf::from("/archive/copy.bin"), 1024),
//!     ],
//! );
//! assert_eq!(group.duplicate_count(), 1);
//! assert_eq!(group.wasted_space(), 1024);
//! ```

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::aggregator::MatchAggregator;
use crate::scanner::{FileEntry, Hash};

/// Confirmed duplicate group of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// BLAKE3 hash of the file content (32 bytes)
    pub hash: Hash,
    /// File size in bytes (shared by all files in the group)
    pub size: u64,
    /// Members in canonical order, representative first
    pub files: Vec<FileEntry>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    ///
    /// # Arguments
    ///
    /// * `hash` - BLAKE3 content hash
    /// * `size` - File size in bytes
    /// * `files` - Member entries, already in canonical order
    #[must_use]
    pub fn new(hash: Hash, size: u64, files: Vec<FileEntry>) -> Self {
        Self { hash, size, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The representative member.
    #[must_use]
    pub fn representative(&self) -> Option<&FileEntry> {
        self.files.first()
    }

    /// Members other than the representative.
    #[must_use]
    pub fn others(&self) -> &[FileEntry] {
        self.files.get(1..).unwrap_or(&[])
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Total wasted space (all copies minus one).
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        crate::scanner::hash_to_hex(&self.hash)
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Canonical member order: shorter paths first, then the raw path bytes.
///
/// Ties compare the whole path string, not its components, so `r/a.b/x`
/// sorts before `r/a/b/x`.
fn compare_members(a: &Path, b: &Path) -> Ordering {
    let (a, b) = (a.as_os_str(), b.as_os_str());
    a.len()
        .cmp(&b.len())
        .then_with(|| a.as_encoded_bytes().cmp(b.as_encoded_bytes()))
}

/// Canonical group order: larger representatives first, then hash hex.
fn compare_groups(a: &DuplicateGroup, b: &DuplicateGroup) -> Ordering {
    b.size.cmp(&a.size).then_with(|| a.hash_hex().cmp(&b.hash_hex()))
}

/// Sort members of one group and every group of a report in place.
pub fn sort_groups(groups: &mut [DuplicateGroup]) {
    for group in groups.iter_mut() {
        group.files.sort_by(|a, b| compare_members(&a.path, &b.path));
        if let Some(first) = group.files.first() {
            group.size = first.size;
        }
    }
    groups.sort_by(compare_groups);
}

/// Produce the ordered report from the aggregator's groups.
#[must_use]
pub fn finalize(aggregator: MatchAggregator) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = aggregator
        .into_groups()
        .filter(|group| group.len() > 1)
        .map(|group| {
            let files: Vec<FileEntry> = group.members().map(|r| r.to_entry()).collect();
            let size = files.first().map_or(0, |f| f.size);
            DuplicateGroup::new(group.hash(), size, files)
        })
        .collect();

    sort_groups(&mut groups);
    log::debug!("Finalized {} duplicate group(s)", groups.len());
    groups
}
