//! Match aggregation.
//!
//! The aggregator is the only writer of the group map. It runs as the single
//! worker of its own pool, drains confirmed matches, and returns the map when
//! the queue closes. Groups are keyed by the hex digest, so transitivity
//! falls out of the shared key: if A~C and B~C, all three carry the same
//! hash and land in the same group.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use super::hashing::ConfirmedMatch;
use super::registry::FileRecord;
use crate::scanner::{hash_to_hex, Hash};

/// A set of records sharing one content hash.
#[derive(Debug, Clone)]
pub struct Group {
    hash: Hash,
    members: BTreeMap<PathBuf, Arc<FileRecord>>,
}

impl Group {
    fn new(hash: Hash) -> Self {
        Self {
            hash,
            members: BTreeMap::new(),
        }
    }

    /// The shared digest.
    #[must_use]
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether a record with this path is a member.
    #[must_use]
    pub fn contains(&self, path: &std::path::Path) -> bool {
        self.members.contains_key(path)
    }

    /// Members in path order.
    pub fn members(&self) -> impl Iterator<Item = &Arc<FileRecord>> {
        self.members.values()
    }

    /// Add a record unless it is already present.
    fn insert(&mut self, record: &Arc<FileRecord>) -> bool {
        if self.members.contains_key(record.path()) {
            return false;
        }
        self.members
            .insert(record.path().to_path_buf(), Arc::clone(record));
        true
    }
}

/// Hash-keyed map of duplicate groups.
#[derive(Debug, Default)]
pub struct MatchAggregator {
    groups: HashMap<String, Group>,
    matches_received: u64,
}

impl MatchAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one confirmed match.
    ///
    /// Creates the group for the match's hash on first sight, otherwise adds
    /// whichever side is missing. Inserting the same match again is a no-op.
    pub fn insert(&mut self, confirmed: &ConfirmedMatch) {
        self.matches_received += 1;
        let key = hash_to_hex(&confirmed.hash);

        debug_assert!(
            self.groups
                .iter()
                .filter(|(k, _)| **k != key)
                .all(|(_, g)| !g.contains(confirmed.a.path()) && !g.contains(confirmed.b.path())),
            "a record can only carry one hash"
        );

        let group = self.groups.entry(key).or_insert_with(|| {
            log::trace!("New group {}", hash_to_hex(&confirmed.hash));
            Group::new(confirmed.hash)
        });
        group.insert(&confirmed.a);
        group.insert(&confirmed.b);
    }

    /// Drain `matches` until every sender is gone.
    ///
    /// This is the body of the aggregation stage's single worker.
    #[must_use]
    pub fn aggregate(matches: Receiver<ConfirmedMatch>) -> Self {
        let mut aggregator = Self::new();
        for confirmed in matches.iter() {
            aggregator.insert(&confirmed);
        }
        log::debug!(
            "Aggregated {} match(es) into {} group(s)",
            aggregator.matches_received,
            aggregator.groups.len()
        );
        aggregator
    }

    /// Look up the group for a hex digest.
    #[must_use]
    pub fn group(&self, hash_hex: &str) -> Option<&Group> {
        self.groups.get(hash_hex)
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no match has produced a group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Matches merged so far, including repeats.
    #[must_use]
    pub fn matches_received(&self) -> u64 {
        self.matches_received
    }

    /// Consume the aggregator, yielding its groups in no particular order.
    pub fn into_groups(self) -> impl Iterator<Item = Group> {
        self.groups.into_values()
    }
}
