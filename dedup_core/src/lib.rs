//! Per-file ingest, duplicate detection and the scoring/representative
//! policy that ties the hashing, caching and storage crates together.
//!
//! This is the crate a caller (a CLI, not built here) depends on for the
//! public operations surface named in spec.md §6: [`Processor::ingest`],
//! [`deduplicate`], [`score`] and [`similarity`].

mod config;
mod detector;
mod disjoint_set;
mod metadata_project;
mod processor;
mod representative;
mod score;
mod similarity;

pub use config::{DedupConfig, PoolConfig};
pub use detector::deduplicate;
pub use metadata_project::project_metadata;
pub use processor::Processor;
pub use representative::select_representatives;
pub use score::{score, score_row};
pub use similarity::similarity;

pub use dedup_cache::{JobCache, JobStore, TaggedValue};
pub use dedup_common::{
    Cluster, DedupError, DedupResult, DeduplicationResult, DuplicateSet, ErrorContext, ErrorKind, FileInfo,
    FileRecord, FileStats, FrameHash, FrameInfo, FrameSelectPolicy, FrameSource, MediaInfo, Metadata, MetadataReader,
    RawTags, RepresentativeError,
};
pub use dedup_hash::{dtw_similarity, hamming_distance, image_similarity, image_video_similarity, video_video_similarity, SimilarityThresholds, WindowConfig};
pub use dedup_phash::{build_select_policy, hash_image, hash_video, FrameSelectConfig, HashConfig};
pub use dedup_store::{FileRow, MediaSummary, Store};
