//! Hash distance and similarity primitives.
//!
//! This crate has no knowledge of files, caches or storage; it is pure
//! computation over the [`dedup_common`] data model, callable from both
//! the per-file processor and the duplicate detector.

mod config;
mod distance;
mod similarity;

pub use config::{SimilarityThresholds, WindowConfig};
pub use distance::hamming_distance;
pub use similarity::{dtw_similarity, image_similarity, image_video_similarity, video_video_similarity};
