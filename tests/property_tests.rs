use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use twinfind::duplicates::{
    sort_groups, CandidateGenerator, DuplicateFinder, DuplicateGroup, FileRegistry, FinderConfig,
};
use twinfind::scanner::{Blake3Hasher, ContentHasher, FileEntry, Hash, HashError};

/// (name index, size, content byte)
type Spec = (u8, u64, u8);

/// Hashes synthetic content instead of touching the filesystem.
struct SyntheticHasher {
    contents: HashMap<PathBuf, Vec<u8>>,
}

impl ContentHasher for SyntheticHasher {
    fn hash_file(&self, path: &Path) -> Result<Hash, HashError> {
        self.contents
            .get(path)
            .map(|c| Blake3Hasher::hash_bytes(c))
            .ok_or_else(|| HashError::NotFound(path.to_path_buf()))
    }
}

fn path_for(index: usize, name: u8) -> PathBuf {
    PathBuf::from(format!("/p{}/n{}.bin", index, name))
}

fn build(specs: &[(usize, Spec)]) -> (Vec<FileEntry>, SyntheticHasher) {
    let mut entries = Vec::new();
    let mut contents = HashMap::new();
    for &(index, (name, size, fill)) in specs {
        let path = path_for(index, name);
        entries.push(FileEntry::new(path.clone(), size));
        contents.insert(path, vec![fill; size as usize]);
    }
    (entries, SyntheticHasher { contents })
}

/// Groups computed by brute force.
///
/// Pairs need equal size and content (and name, when enabled); a pair's
/// files join the group of their content digest, so same-content pairs with
/// different names still end up together.
fn expected_groups(specs: &[(usize, Spec)], match_by_name: bool) -> BTreeSet<BTreeSet<PathBuf>> {
    let mut groups: BTreeMap<(u64, u8), BTreeSet<PathBuf>> = BTreeMap::new();
    for (i, &(index_a, (name_a, size_a, fill_a))) in specs.iter().enumerate() {
        for &(index_b, (name_b, size_b, fill_b)) in &specs[i + 1..] {
            let paired = size_a == size_b && (!match_by_name || name_a == name_b);
            if paired && fill_a == fill_b {
                let group = groups.entry((size_a, fill_a)).or_default();
                group.insert(path_for(index_a, name_a));
                group.insert(path_for(index_b, name_b));
            }
        }
    }
    groups.into_values().collect()
}

fn run(
    specs: &[(usize, Spec)],
    match_by_name: bool,
    workers: usize,
) -> Vec<DuplicateGroup> {
    let (entries, hasher) = build(specs);
    let config = FinderConfig::default()
        .with_hasher(Arc::new(hasher))
        .with_match_by_name(match_by_name)
        .with_worker_count(workers)
        .with_queue_capacity(4);
    let (groups, _) = DuplicateFinder::new(config)
        .find_duplicates_from_files(entries)
        .unwrap();
    groups
}

fn spec_strategy() -> impl Strategy<Value = Vec<(usize, Spec)>> {
    prop::collection::vec((0u8..3, 1u64..4, 0u8..3), 0..24).prop_map(|specs| {
        specs.into_iter().enumerate().collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_groups_match_brute_force(specs in spec_strategy(), match_by_name in any::<bool>()) {
        let groups = run(&specs, match_by_name, 3);
        let actual: BTreeSet<BTreeSet<PathBuf>> = groups
            .iter()
            .map(|g| g.paths().into_iter().collect())
            .collect();

        prop_assert_eq!(actual, expected_groups(&specs, match_by_name));
    }

    #[test]
    fn test_report_is_independent_of_input_order(
        (specs, shuffled) in spec_strategy().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
        match_by_name in any::<bool>(),
    ) {
        let first = run(&specs, match_by_name, 1);
        let second = run(&shuffled, match_by_name, 4);

        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_no_file_in_two_groups(specs in spec_strategy()) {
        let groups = run(&specs, false, 4);
        let mut seen = BTreeSet::new();
        for group in &groups {
            prop_assert!(group.files.len() >= 2);
            for file in &group.files {
                prop_assert!(seen.insert(file.path.clone()), "{} in two groups", file.path.display());
                prop_assert_eq!(file.size, group.size);
            }
        }
    }

    #[test]
    fn test_report_ordering(specs in spec_strategy()) {
        let groups = run(&specs, false, 2);
        for group in &groups {
            for pair in group.files.windows(2) {
                let (a, b) = (pair[0].path.as_os_str(), pair[1].path.as_os_str());
                let key_a = (a.len(), a.as_encoded_bytes());
                let key_b = (b.len(), b.as_encoded_bytes());
                prop_assert!(key_a < key_b);
            }
        }
        for pair in groups.windows(2) {
            prop_assert!(
                pair[0].size > pair[1].size
                    || (pair[0].size == pair[1].size && pair[0].hash_hex() < pair[1].hash_hex())
            );
        }
    }

    #[test]
    fn test_member_order_is_length_then_bytes(names in prop::collection::btree_set("[ab./]{1,6}", 2..8)) {
        let files = names
            .iter()
            .map(|n| FileEntry::new(PathBuf::from(format!("r/{}", n)), 1))
            .collect();
        let mut groups = vec![DuplicateGroup::new([0; 32], 1, files)];
        sort_groups(&mut groups);

        for pair in groups[0].files.windows(2) {
            let (a, b) = (pair[0].path.as_os_str(), pair[1].path.as_os_str());
            prop_assert!((a.len(), a.as_encoded_bytes()) < (b.len(), b.as_encoded_bytes()));
        }
    }

    #[test]
    fn test_pair_count_matches_quadratic_filter(specs in spec_strategy(), match_by_name in any::<bool>()) {
        let (entries, _) = build(&specs);
        let mut registry = FileRegistry::new();
        registry.extend(entries.clone()).unwrap();

        let mut naive = 0u64;
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let same_size = entries[i].size == entries[j].size;
                let same_name = !match_by_name || entries[i].name == entries[j].name;
                if same_size && same_name {
                    naive += 1;
                }
            }
        }

        let generator = CandidateGenerator::new(&registry, match_by_name);
        prop_assert_eq!(generator.pairs().count() as u64, naive);
        prop_assert_eq!(generator.stats().candidate_pairs, naive);
    }
}
