use dedup_hash::{SimilarityThresholds, WindowConfig};
use dedup_phash::{FrameSelectConfig, HashConfig};

/// Worker pool sizing and the content-hash chunking threshold, the two
/// options that don't naturally belong to hashing or similarity.
///
/// Grouped the way the teacher groups its own CLI option structs
/// (`AppCfg`/`HashCfg`/`CacheCfg`): one small `Default`-able struct per
/// concern rather than a single flat bag of fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoolConfig {
    /// Worker pool size for CPU-bound hashing and per-file ingest.
    pub concurrency: usize,
    /// Files at or below this size get a full-file content hash; larger
    /// files get a head+tail partial hash of this many bytes each.
    pub max_chunk_size: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: num_cpus(),
            max_chunk_size: dedup_common::CONTENT_HASH_FULL_THRESHOLD_BYTES,
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(4)
}

/// Every configuration option named in spec.md §6, grouped by concern.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct DedupConfig {
    pub hash: HashConfig,
    pub frame_select: FrameSelectConfig,
    pub thresholds: SimilarityThresholds,
    pub window: WindowConfig,
    pub pool: PoolConfig,
}
