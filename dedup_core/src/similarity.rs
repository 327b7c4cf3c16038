use dedup_common::{FileInfo, MediaInfo};
use dedup_hash::{image_similarity, image_video_similarity, video_video_similarity};

use crate::config::DedupConfig;

/// Similarity between two ingested files, dispatching on media kind
/// (image/image, image/video, video/video) to the matching C2 function.
/// Exposed as a pure debug-tooling helper per spec.md §6; the duplicate
/// detector computes the same dispatch itself (`detector::pairwise_similarity`)
/// over the store's reconstructed minimal `MediaInfo`s rather than full
/// `FileInfo`s, so this helper is not on the detector's hot path.
#[must_use]
pub fn similarity(a: &FileInfo, b: &FileInfo, config: &DedupConfig) -> f64 {
    media_similarity(&a.media, &b.media, config)
}

pub(crate) fn media_similarity(a: &MediaInfo, b: &MediaInfo, config: &DedupConfig) -> f64 {
    match (a.is_image(), b.is_image()) {
        (true, true) => image_similarity(a.primary_hash(), b.primary_hash()),
        (false, false) => video_video_similarity(a, b, config.window, config.thresholds.video_threshold),
        (true, false) => image_video_similarity(a.primary_hash(), b, config.thresholds.image_video_threshold),
        (false, true) => image_video_similarity(b.primary_hash(), a, config.thresholds.image_video_threshold),
    }
}
