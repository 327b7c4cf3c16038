//! Shared data model for the deduplication engine.
//!
//! This crate has no I/O and no algorithms of its own; it defines the
//! types that flow between the hashing, caching, storage and clustering
//! crates, plus the error taxonomy used across all of them.

mod cluster;
mod collab;
mod error;
mod file_info;
mod file_record;
mod file_stats;
mod frame;
mod metadata;

pub use cluster::{Cluster, DeduplicationResult, DuplicateSet, RepresentativeError};
pub use collab::{FrameSelectPolicy, FrameSource, MetadataReader, RawTags};
pub use error::{DedupError, DedupResult, ErrorContext, ErrorKind};
pub use file_info::FileInfo;
pub use file_record::{lsh_bands, FileRecord};
pub use file_stats::{
    content_hash, content_hash_with_threshold, partial_read_len, partial_read_len_with_threshold, FileStats,
    CONTENT_HASH_FULL_THRESHOLD_BYTES,
};
pub use frame::{FrameHash, FrameInfo, MediaInfo};
pub use metadata::Metadata;
