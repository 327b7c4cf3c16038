use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use dedup_common::{lsh_bands, Cluster, DeduplicationResult, DuplicateSet, FrameHash, FrameInfo, MediaInfo, RepresentativeError};
use dedup_hash::{image_similarity, image_video_similarity, video_video_similarity};
use dedup_store::{FileRow, Store};
use rayon::prelude::*;

use crate::config::DedupConfig;
use crate::disjoint_set::DisjointSet;
use crate::representative::select_representatives;

/// Runs the full four-stage duplicate detector (spec.md §4.7) over
/// `paths`, reading their rows from `store` as a point-in-time snapshot.
///
/// A store error while fetching `paths`' rows up front is fatal for the
/// run (Stage A requires that snapshot to exist at all); errors fetching
/// LSH candidates for one Stage B target are logged and only drop that
/// target, per the spec's Stage B failure semantics.
pub fn deduplicate(store: &Store, paths: &[PathBuf], config: &DedupConfig) -> dedup_common::DedupResult<DeduplicationResult> {
    let rows = store.get_many(paths)?;
    let path_set: BTreeSet<PathBuf> = paths.iter().cloned().collect();

    let (exact_clusters, candidate_pool, mut unique) = stage_a(paths, &rows);
    let similarity_clusters = stage_b(store, &rows, &path_set, &candidate_pool, config);
    let final_clusters = stage_c(&exact_clusters, &similarity_clusters);

    // Stage B only returns clusters of size >= 2; a candidate that matched
    // nothing never appears in `final_clusters` and falls through to unique.
    let clustered: BTreeSet<&PathBuf> = final_clusters.iter().flatten().collect();
    unique.extend(candidate_pool.iter().filter(|p| !clustered.contains(p)).cloned());

    let duplicate_sets = stage_d(&final_clusters, &rows, config, &mut unique);

    Ok(DeduplicationResult::new(unique, duplicate_sets))
}

/// Groups `paths` by exact pHash equality. Returns `(exact_clusters,
/// candidate_pool, unclassified)`: groups of size >= 2, the paths left
/// over from groups of size 1 (carried forward to Stage B), and paths
/// with no pHash at all (emitted straight to `unique`).
fn stage_a(paths: &[PathBuf], rows: &HashMap<PathBuf, FileRow>) -> (Vec<Cluster>, Vec<PathBuf>, BTreeSet<PathBuf>) {
    let mut by_phash: HashMap<String, Vec<PathBuf>> = HashMap::new();
    let mut unclassified = BTreeSet::new();

    for path in paths {
        match rows.get(path).and_then(|r| r.p_hash_hex.clone()) {
            Some(hex) => by_phash.entry(hex).or_default().push(path.clone()),
            None => {
                unclassified.insert(path.clone());
            }
        }
    }

    let mut exact_clusters = Vec::new();
    let mut candidate_pool = Vec::new();
    for group in by_phash.into_values() {
        if group.len() >= 2 {
            exact_clusters.push(group.into_iter().collect());
        } else {
            candidate_pool.extend(group);
        }
    }

    (exact_clusters, candidate_pool, unclassified)
}

/// LSH recall + adaptive-threshold verification over the Stage A
/// candidate pool, producing similarity clusters of size >= 2.
fn stage_b(store: &Store, rows: &HashMap<PathBuf, FileRow>, path_set: &BTreeSet<PathBuf>, candidate_pool: &[PathBuf], config: &DedupConfig) -> Vec<Cluster> {
    let mut processed: BTreeSet<PathBuf> = BTreeSet::new();
    let mut clusters = Vec::new();

    for target in candidate_pool {
        if processed.contains(target) {
            continue;
        }

        let Some(target_row) = rows.get(target) else {
            processed.insert(target.clone());
            continue;
        };
        let Some(target_hash_hex) = &target_row.p_hash_hex else {
            processed.insert(target.clone());
            continue;
        };

        let bands = lsh_bands(target_hash_hex);
        let candidates = match store.find_lsh_candidates(target, &bands) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("find_lsh_candidates failed for {}, marking processed: {e}", target.display());
                processed.insert(target.clone());
                continue;
            }
        };

        let target_media = minimal_media_info(target_row);
        let target_is_video = target_row.media_duration > 0.0;

        // Candidate scoring is pure (reads `rows`, no shared mutable state) so it
        // fans out across `rayon`'s global pool; only the `processed`/`clusters`
        // bookkeeping around it stays sequential.
        let matched: Vec<PathBuf> = candidates
            .into_par_iter()
            .filter(|cand| cand != target && !processed.contains(cand) && path_set.contains(cand))
            .filter_map(|cand| {
                let cand_row = rows.get(&cand)?;
                let cand_media = minimal_media_info(cand_row);
                let cand_is_video = cand_row.media_duration > 0.0;
                let threshold = config.thresholds.for_pair(target_is_video, cand_is_video);
                let sim = pairwise_similarity(&target_media, target_is_video, &cand_media, cand_is_video, config);
                (sim >= threshold).then_some(cand)
            })
            .collect();

        let mut neighbors: BTreeSet<PathBuf> = BTreeSet::from([target.clone()]);
        neighbors.extend(matched);

        if neighbors.len() > 1 {
            processed.extend(neighbors.iter().cloned());
            clusters.push(neighbors);
        } else {
            processed.insert(target.clone());
        }
    }

    clusters
}

/// Union-find merge of every exact and similarity cluster into disjoint
/// final clusters.
fn stage_c(exact_clusters: &[Cluster], similarity_clusters: &[Cluster]) -> Vec<Cluster> {
    let mut ds: DisjointSet<PathBuf> = DisjointSet::default();
    for cluster in exact_clusters.iter().chain(similarity_clusters.iter()) {
        ds.union_cluster(cluster);
    }
    ds.all_sets().cloned().collect()
}

/// Selects representatives for each final cluster, demoting clusters
/// that turn out not to qualify (size 1 after a missing row, or a
/// representative-selection error) to `unique`.
fn stage_d(final_clusters: &[Cluster], rows: &HashMap<PathBuf, FileRow>, config: &DedupConfig, unique: &mut BTreeSet<PathBuf>) -> Vec<DuplicateSet> {
    let mut duplicate_sets = Vec::new();

    for cluster in final_clusters {
        if cluster.len() < 2 {
            unique.extend(cluster.iter().cloned());
            continue;
        }

        let cluster_rows: Vec<FileRow> = cluster.iter().filter_map(|p| rows.get(p).cloned()).collect();
        match select_representatives(&cluster_rows, config.thresholds.image_threshold) {
            Ok(set) => duplicate_sets.push(set),
            Err(RepresentativeError::EmptyCluster | RepresentativeError::SingleMember) => {
                log::warn!("representative selection yielded fewer than two members for a cluster of size {}, demoting to unique", cluster.len());
                unique.extend(cluster.iter().cloned());
            }
        }
    }

    duplicate_sets
}

/// Reconstructs the "minimal" `MediaInfo` the store's thin projection
/// supports: a single frame at timestamp 0 carrying the row's primary
/// pHash (if any), at the row's duration. See DESIGN.md for why Stage B
/// similarity checks only ever compare primary hashes.
fn minimal_media_info(row: &FileRow) -> MediaInfo {
    let hash = row.p_hash_hex.as_deref().and_then(FrameHash::from_hex);
    MediaInfo::new(row.media_duration, vec![FrameInfo::new(hash, 0.0)])
}

fn pairwise_similarity(a: &MediaInfo, a_is_video: bool, b: &MediaInfo, b_is_video: bool, config: &DedupConfig) -> f64 {
    match (a_is_video, b_is_video) {
        (false, false) => image_similarity(a.primary_hash(), b.primary_hash()),
        (true, true) => video_video_similarity(a, b, config.window, config.thresholds.video_threshold),
        (true, false) => image_video_similarity(b.primary_hash(), a, config.thresholds.image_video_threshold),
        (false, true) => image_video_similarity(a.primary_hash(), b, config.thresholds.image_video_threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedup_common::{FileInfo, FileStats, Metadata};

    fn ingest_image(store: &Store, path: &str, hash: &[u8; 8], width: u32, height: u32, size: u64, image_date: Option<i64>) {
        let info = FileInfo::new(
            PathBuf::from(path),
            FileStats::new(vec![0u8; 16], size, 0, 0),
            Metadata {
                width: Some(width),
                height: Some(height),
                image_date,
                ..Metadata::empty()
            },
            MediaInfo::new(0.0, vec![FrameInfo::new(Some(FrameHash::from_bytes(hash.to_vec())), 0.0)]),
        );
        store.upsert(&info).unwrap();
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn s1_pure_exact_duplicates() {
        let store = Store::open_in_memory().unwrap();
        ingest_image(&store, "a.jpg", &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11], 100, 100, 1000, None);
        ingest_image(&store, "b.jpg", &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11], 100, 100, 2000, None);

        let result = deduplicate(&store, &paths(&["a.jpg", "b.jpg"]), &DedupConfig::default()).unwrap();

        assert!(result.unique.is_empty());
        assert_eq!(result.duplicate_sets.len(), 1);
        let set = &result.duplicate_sets[0];
        assert_eq!(set.best, PathBuf::from("b.jpg"));
        assert_eq!(set.representatives, BTreeSet::from([PathBuf::from("b.jpg")]));
        assert_eq!(set.duplicates, BTreeSet::from([PathBuf::from("a.jpg")]));
    }

    #[test]
    fn s2_lsh_near_duplicate_clusters() {
        let store = Store::open_in_memory().unwrap();
        ingest_image(&store, "s1.jpg", &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11], 100, 100, 1000, None);
        ingest_image(&store, "s2.jpg", &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x12], 100, 100, 1000, None);

        let result = deduplicate(&store, &paths(&["s1.jpg", "s2.jpg"]), &DedupConfig::default()).unwrap();

        assert!(result.unique.is_empty());
        assert_eq!(result.duplicate_sets.len(), 1);
        assert_eq!(result.duplicate_sets[0].all_members(), BTreeSet::from([PathBuf::from("s1.jpg"), PathBuf::from("s2.jpg")]));
    }

    #[test]
    fn s3_below_threshold_stays_unique() {
        let store = Store::open_in_memory().unwrap();
        ingest_image(&store, "x.jpg", &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11], 100, 100, 1000, None);
        ingest_image(&store, "y.jpg", &[0xAA, 0xBB, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x11], 100, 100, 1000, None);

        let result = deduplicate(&store, &paths(&["x.jpg", "y.jpg"]), &DedupConfig::default()).unwrap();

        assert!(result.duplicate_sets.is_empty());
        assert_eq!(result.unique, BTreeSet::from([PathBuf::from("x.jpg"), PathBuf::from("y.jpg")]));
    }

    #[test]
    fn s5_missing_phash_is_unique() {
        let store = Store::open_in_memory().unwrap();
        let broken = FileInfo::new(
            PathBuf::from("broken.jpg"),
            FileStats::new(vec![0u8; 16], 100, 0, 0),
            Metadata::empty(),
            MediaInfo::new(0.0, vec![FrameInfo::new(None, 0.0)]),
        );
        store.upsert(&broken).unwrap();
        ingest_image(&store, "c.png", &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88], 100, 100, 100, None);

        let result = deduplicate(&store, &paths(&["broken.jpg", "c.png"]), &DedupConfig::default()).unwrap();

        assert!(result.duplicate_sets.is_empty());
        assert_eq!(result.unique, BTreeSet::from([PathBuf::from("broken.jpg"), PathBuf::from("c.png")]));
    }

    #[test]
    fn s6_mixed_exact_group_and_unrelated() {
        let store = Store::open_in_memory().unwrap();
        ingest_image(&store, "a.jpg", &[0xAA; 8], 100, 100, 1000, None);
        ingest_image(&store, "b.jpg", &[0xAA; 8], 100, 100, 2000, None);
        ingest_image(&store, "c.png", &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88], 100, 100, 100, None);

        let result = deduplicate(&store, &paths(&["a.jpg", "b.jpg", "c.png"]), &DedupConfig::default()).unwrap();

        assert_eq!(result.unique, BTreeSet::from([PathBuf::from("c.png")]));
        assert_eq!(result.duplicate_sets.len(), 1);
        assert_eq!(result.duplicate_sets[0].all_members(), BTreeSet::from([PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]));
    }

    #[test]
    fn cluster_partition_covers_every_input_path_exactly_once() {
        let store = Store::open_in_memory().unwrap();
        ingest_image(&store, "a.jpg", &[0xAA; 8], 100, 100, 1000, None);
        ingest_image(&store, "b.jpg", &[0xAA; 8], 100, 100, 2000, None);
        ingest_image(&store, "c.png", &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88], 100, 100, 100, None);

        let input = paths(&["a.jpg", "b.jpg", "c.png"]);
        let result = deduplicate(&store, &input, &DedupConfig::default()).unwrap();

        assert_eq!(result.total_paths(), input.len());
        let mut seen = result.unique.clone();
        for set in &result.duplicate_sets {
            for member in set.all_members() {
                assert!(seen.insert(member), "path counted in more than one output bucket");
            }
        }
        assert_eq!(seen.len(), input.len());
    }
}
