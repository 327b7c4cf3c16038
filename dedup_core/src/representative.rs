use std::collections::BTreeSet;
use std::path::PathBuf;

use dedup_common::{DuplicateSet, FrameHash, RepresentativeError};
use dedup_hash::image_similarity;
use dedup_store::FileRow;

use crate::score::score_row;

/// Picks the representative(s) of a cluster of size >= 2, per spec.md
/// §4.3:
///
/// 1. Sort members by score descending (stable over `rows`' input
///    order, so ties resolve the same way every run).
/// 2. `best` is the top member.
/// 3. If `best` is an image, it is the only representative.
/// 4. If `best` is a video, scan the rest in score order and greedily
///    keep image captures that meet or exceed `best`'s quality, carry an
///    `image_date` whenever `best` does, and are not a near-duplicate
///    (image similarity >= `image_threshold`) of any capture already
///    kept.
///
/// `rows` must cover exactly the cluster's members; order is the
/// tie-break input order for the score sort. Returns
/// [`RepresentativeError`] if the cluster selection would yield fewer
/// than two total members (callers treat that as "demote to unique",
/// per spec.md §4.7 Stage D).
pub fn select_representatives(rows: &[FileRow], image_threshold: f64) -> Result<DuplicateSet, RepresentativeError> {
    if rows.is_empty() {
        return Err(RepresentativeError::EmptyCluster);
    }

    let mut ranked: Vec<&FileRow> = rows.iter().collect();
    ranked.sort_by(|a, b| score_row(b).partial_cmp(&score_row(a)).unwrap_or(std::cmp::Ordering::Equal));

    let best = ranked[0];
    let rest = &ranked[1..];

    let mut representatives: BTreeSet<PathBuf> = BTreeSet::new();
    representatives.insert(best.path.clone());

    if !best.is_video() {
        let duplicates: BTreeSet<PathBuf> = rest.iter().map(|r| r.path.clone()).collect();
        return DuplicateSet::new(best.path.clone(), representatives, duplicates);
    }

    let best_quality = best.quality();
    let mut kept_hashes: Vec<FrameHash> = Vec::new();

    for candidate in rest {
        if candidate.is_video() {
            continue;
        }
        if candidate.quality() < best_quality {
            continue;
        }
        if best.image_date.is_some() && candidate.image_date.is_none() {
            continue;
        }
        let Some(candidate_hash) = candidate.p_hash_hex.as_deref().and_then(FrameHash::from_hex) else {
            continue;
        };
        let is_duplicate_of_kept = kept_hashes.iter().any(|kept| image_similarity(Some(kept), Some(&candidate_hash)) >= image_threshold);
        if is_duplicate_of_kept {
            continue;
        }
        kept_hashes.push(candidate_hash);
        representatives.insert(candidate.path.clone());
    }

    let duplicates: BTreeSet<PathBuf> = rest.iter().filter(|r| !representatives.contains(&r.path)).map(|r| r.path.clone()).collect();

    DuplicateSet::new(best.path.clone(), representatives, duplicates)
}

trait RowExt {
    fn is_video(&self) -> bool;
    fn quality(&self) -> u64;
}

impl RowExt for FileRow {
    fn is_video(&self) -> bool {
        self.media_duration > 0.0
    }

    fn quality(&self) -> u64 {
        match (self.width, self.height) {
            (Some(w), Some(h)) => u64::from(w) * u64::from(h),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, duration: f64, width: Option<u32>, height: Option<u32>, image_date: Option<i64>, p_hash: &str, size: u64) -> FileRow {
        FileRow {
            path: path.into(),
            content_hash_hex: "deadbeef".to_string(),
            size,
            created_at_millis: 0,
            modified_at_millis: 0,
            width,
            height,
            gps_lat: None,
            gps_lon: None,
            camera_model: None,
            image_date,
            media_duration: duration,
            p_hash_hex: Some(p_hash.to_string()),
            lsh1: None,
            lsh2: None,
            lsh3: None,
            lsh4: None,
        }
    }

    #[test]
    fn image_best_keeps_only_itself() {
        let a = row("a.jpg", 0.0, Some(100), Some(100), Some(1), "aaaaaaaaaaaaaaaa", 2000);
        let b = row("b.jpg", 0.0, Some(50), Some(50), None, "aaaaaaaaaaaaaaaa", 1000);
        let set = select_representatives(&[a, b], 0.98).unwrap();
        assert_eq!(set.best, PathBuf::from("a.jpg"));
        assert_eq!(set.representatives, BTreeSet::from([PathBuf::from("a.jpg")]));
        assert_eq!(set.duplicates, BTreeSet::from([PathBuf::from("b.jpg")]));
    }

    #[test]
    fn video_best_keeps_distinct_high_quality_still() {
        let video = row("v.mp4", 10.0, Some(640), Some(480), Some(1), "0000000000000000", 500_000);
        let still = row("p.jpg", 0.0, Some(4000), Some(3000), Some(2), "ffffffffffffffff", 8_000_000);
        let set = select_representatives(&[video, still], 0.98).unwrap();
        assert_eq!(set.best, PathBuf::from("v.mp4"));
        assert_eq!(set.representatives, BTreeSet::from([PathBuf::from("v.mp4"), PathBuf::from("p.jpg")]));
        assert!(set.duplicates.is_empty());
    }

    #[test]
    fn video_best_drops_near_duplicate_stills_of_a_kept_capture() {
        let video = row("v.mp4", 10.0, Some(640), Some(480), None, "0000000000000000", 500_000);
        let still_a = row("a.jpg", 0.0, Some(4000), Some(3000), None, "ffffffffffffffff", 8_000_000);
        // one bit different from still_a -> near-duplicate under default 0.98 threshold
        let still_b = row("b.jpg", 0.0, Some(4000), Some(3000), None, "fffffffffffffffe", 7_000_000);
        let set = select_representatives(&[video, still_a, still_b], 0.98).unwrap();
        assert_eq!(set.representatives.len(), 2);
        assert!(set.representatives.contains(&PathBuf::from("v.mp4")));
        assert!(set.duplicates.contains(&PathBuf::from("b.jpg")) || set.duplicates.contains(&PathBuf::from("a.jpg")));
    }

    #[test]
    fn video_best_rejects_low_quality_or_missing_date_stills() {
        let video = row("v.mp4", 10.0, Some(1920), Some(1080), Some(1), "0000000000000000", 500_000);
        let low_res = row("small.jpg", 0.0, Some(100), Some(100), Some(2), "ffffffffffffffff", 8_000_000);
        let no_date = row("nodate.jpg", 0.0, Some(4000), Some(3000), None, "1111111111111111", 8_000_000);
        let set = select_representatives(&[video, low_res, no_date], 0.98).unwrap();
        assert_eq!(set.representatives, BTreeSet::from([PathBuf::from("v.mp4")]));
        assert_eq!(set.duplicates.len(), 2);
    }

    #[test]
    fn single_row_is_rejected_as_empty_selection() {
        let a = row("a.jpg", 0.0, None, None, None, "0", 1);
        let err = select_representatives(&[a], 0.98).unwrap_err();
        assert_eq!(err, RepresentativeError::SingleMember);
    }
}
