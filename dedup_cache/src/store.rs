use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering::Relaxed};

use dedup_common::{DedupError, DedupResult};
use log::{info, trace, warn};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

type CacheDiskFormat<T> = HashMap<String, T>;

/// A flat, content-hash-keyed key/value store backed by a single file,
/// written as one `bincode` blob. Generalizes the teacher's mtime-keyed
/// `BaseFsCache<T>` to a content-hash key, since job-cache validity here
/// is driven by a config snapshot rather than a filesystem timestamp.
///
/// Writes are batched: an in-memory `RwLock<HashMap<..>>` absorbs
/// inserts/removals, and the file is only rewritten once
/// `cache_save_threshold` modifications have accumulated (or `save` is
/// called explicitly). Every rewrite goes to a `.tmp` sibling first and
/// is atomically renamed into place, so a crash mid-write never corrupts
/// the previous generation.
pub struct BaseFsCache<T> {
    cache_save_threshold: u32,
    cache_modified_count: AtomicU32,
    cache_path: PathBuf,
    cache: RwLock<CacheDiskFormat<T>>,
}

impl<T> BaseFsCache<T>
where
    T: DeserializeOwned + Serialize + Clone,
{
    pub fn open(cache_save_threshold: u32, cache_path: PathBuf) -> DedupResult<Self> {
        let cache = Self::load_from_disk(&cache_path)?;
        Ok(Self {
            cache_save_threshold,
            cache_modified_count: AtomicU32::new(0),
            cache_path,
            cache,
        })
    }

    fn load_from_disk(cache_path: &PathBuf) -> DedupResult<RwLock<CacheDiskFormat<T>>> {
        if !cache_path.exists() {
            info!(target: "job_cache_startup", "creating new cache file: {}", cache_path.display());
            return Ok(RwLock::default());
        }

        let file = std::fs::File::open(cache_path).map_err(|e| {
            DedupError::filesystem(format!("failed to open cache file: {e}"))
                .with_context(ctx(cache_path))
                .with_source(e)
        })?;
        let reader = std::io::BufReader::new(file);
        let data: CacheDiskFormat<T> = bincode::deserialize_from(reader).map_err(|e| {
            DedupError::filesystem(format!("failed to deserialize cache file: {e}")).with_context(ctx(cache_path))
        })?;

        trace!(target: "job_cache_startup", "loaded cache {} with {} entries", cache_path.display(), data.len());
        Ok(RwLock::new(data))
    }

    pub fn save(&self) -> DedupResult<()> {
        if self.cache_modified_count.load(Relaxed) > 0 {
            self.save_inner()
        } else {
            Ok(())
        }
    }

    fn save_inner(&self) -> DedupResult<()> {
        use std::io::BufWriter;

        if !self.cache_path.exists() {
            if let Some(parent) = self.cache_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DedupError::filesystem(format!("failed to create cache directory: {e}"))
                        .with_context(ctx(&self.cache_path))
                        .with_source(e)
                })?;
            }
        }

        let temp_path = self.cache_path.with_extension("tmp");
        let temp_file = std::fs::File::create(&temp_path).map_err(|e| {
            DedupError::filesystem(format!("failed to create temp cache file: {e}"))
                .with_context(ctx(&self.cache_path))
                .with_source(e)
        })?;
        let mut writer = BufWriter::new(temp_file);

        {
            let readable = self.cache.read();
            bincode::serialize_into(&mut writer, &*readable).map_err(|e| {
                DedupError::filesystem(format!("failed to serialize cache: {e}")).with_context(ctx(&self.cache_path))
            })?;
        }

        let file = writer.into_inner().map_err(|e| {
            DedupError::filesystem(format!("failed to flush cache writer: {e}")).with_context(ctx(&self.cache_path))
        })?;
        file.sync_all().map_err(|e| {
            DedupError::filesystem(format!("failed to sync cache file: {e}"))
                .with_context(ctx(&self.cache_path))
                .with_source(e)
        })?;

        std::fs::rename(&temp_path, &self.cache_path).map_err(|e| {
            DedupError::filesystem(format!("failed to install cache file: {e}"))
                .with_context(ctx(&self.cache_path))
                .with_source(e)
        })?;

        self.cache_modified_count.store(0, Relaxed);
        Ok(())
    }

    pub fn insert(&self, key: impl Into<String>, value: T) -> DedupResult<()> {
        {
            let mut writable = self.cache.write();
            writable.insert(key.into(), value);
        }
        let prev = self.cache_modified_count.fetch_add(1, Relaxed);
        self.maybe_save(prev)
    }

    pub fn remove(&self, key: &str) -> DedupResult<()> {
        {
            let mut writable = self.cache.write();
            writable.remove(key);
        }
        let prev = self.cache_modified_count.fetch_add(1, Relaxed);
        self.maybe_save(prev)
    }

    fn maybe_save(&self, prev_count: u32) -> DedupResult<()> {
        if prev_count + 1 >= self.cache_save_threshold {
            self.save_inner()
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn fetch(&self, key: &str) -> Option<T> {
        self.cache.read().get(key).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.cache.read().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn ctx(path: &std::path::Path) -> dedup_common::ErrorContext {
    dedup_common::ErrorContext::new().with_path(path).with_operation("job_cache")
}

/// Decodes a cache payload written in the current `bincode` encoding, or
/// falls back to the self-describing JSON encoding a legacy (pre-tag)
/// payload was written in before giving up and treating the value as a
/// miss. Kept separate from `fetch` so callers that read raw blobs
/// directly (rather than through `BaseFsCache`) can reuse the same
/// fallback-then-miss policy.
pub fn decode_or_warn<T: DeserializeOwned>(bytes: &[u8], context: &str) -> Option<T> {
    match bincode::deserialize(bytes) {
        Ok(value) => Some(value),
        Err(bincode_err) => match serde_json::from_slice(bytes) {
            Ok(value) => {
                warn!("cache payload in {context} is not in the current encoding, decoded as a legacy structured map: {bincode_err}");
                Some(value)
            }
            Err(json_err) => {
                warn!("unrecognized cache payload in {context}, treating as miss: {bincode_err} (legacy decode also failed: {json_err})");
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
    struct Payload {
        n: u32,
        label: String,
    }

    #[test]
    fn decodes_current_bincode_encoding() {
        let value = Payload { n: 7, label: "seven".into() };
        let bytes = bincode::serialize(&value).unwrap();
        assert_eq!(decode_or_warn::<Payload>(&bytes, "test"), Some(value));
    }

    #[test]
    fn falls_back_to_legacy_json_encoding() {
        let value = Payload { n: 7, label: "seven".into() };
        let bytes = serde_json::to_vec(&value).unwrap();
        assert_eq!(decode_or_warn::<Payload>(&bytes, "test"), Some(value));
    }

    #[test]
    fn garbage_bytes_are_a_miss() {
        assert_eq!(decode_or_warn::<Payload>(b"not a valid payload in either encoding", "test"), None);
    }
}
