use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use dedup_common::DedupResult;
use log::warn;
use parking_lot::Mutex;

use crate::payload::TaggedValue;
use crate::store::BaseFsCache;

/// The root of the on-disk job cache: one directory holding two files per
/// job name, `{job}_results` and `{job}_config`, per spec. Splitting the
/// memoized result from the configuration snapshot it was computed under
/// into separate named sub-databases (rather than one combined record)
/// lets either side be inspected/rewritten independently.
pub struct JobCache {
    root: PathBuf,
    save_threshold: u32,
}

impl JobCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, save_threshold: u32) -> Self {
        Self {
            root: root.into(),
            save_threshold,
        }
    }

    /// Opens (creating if absent) the `{job_name}_results`/`{job_name}_config`
    /// sub-database pair for `job_name`.
    pub fn job(&self, job_name: &str) -> DedupResult<JobStore> {
        let results_path = self.root.join(format!("{job_name}_results.cache"));
        let config_path = self.root.join(format!("{job_name}_config.cache"));
        let results = BaseFsCache::open(self.save_threshold, results_path)?;
        let config = BaseFsCache::open(self.save_threshold, config_path)?;
        Ok(JobStore {
            results,
            config,
            key_locks: Mutex::new(HashMap::new()),
        })
    }
}

/// A single job's memoized results, keyed by content hash, backed by the
/// two sub-databases named above: `results` holds the memoized value,
/// `config` the snapshot it was computed under.
pub struct JobStore {
    results: BaseFsCache<TaggedValue>,
    config: BaseFsCache<TaggedValue>,
    key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JobStore {
    /// Looks up `key` and returns its result only if the stored config
    /// snapshot deep-equals `current_config`; a mismatched or absent
    /// config is a miss, not an error.
    #[must_use]
    pub fn fetch_if_valid(&self, key: &str, current_config: &TaggedValue) -> Option<TaggedValue> {
        let stored_config = self.config.fetch(key)?;
        if stored_config != *current_config {
            return None;
        }
        self.results.fetch(key)
    }

    /// Writes `result` and `config` for `key`. The result is written
    /// first, then the config: the config acts as the commit marker a
    /// reader checks before trusting the result, so a crash between the
    /// two writes is always observed as a miss (or, if `config` happened
    /// to already hold this same snapshot, as the just-written result),
    /// never as a stale result paired with a config that claims it's
    /// current. Two separate files can't be renamed into place in one
    /// filesystem transaction, so this ordering is the closest
    /// approximation to the spec's "updated atomically" without one.
    pub fn store(&self, key: &str, result: TaggedValue, config: TaggedValue) -> DedupResult<()> {
        self.results.insert(key.to_string(), result)?;
        self.config.insert(key.to_string(), config)
    }

    pub fn remove(&self, key: &str) -> DedupResult<()> {
        self.results.remove(key)?;
        self.config.remove(key)
    }

    pub fn save(&self) -> DedupResult<()> {
        self.results.save()?;
        self.config.save()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Serializes access to a single key across concurrent callers,
    /// without blocking unrelated keys.
    pub fn with_key_lock<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let key_mutex = {
            let mut locks = self.key_locks.lock();
            locks.entry(key.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let _guard = key_mutex.lock();
        f()
    }

    /// Fetches a valid cached result, or computes, stores and returns a
    /// fresh one. A cache write failure is logged and swallowed: the
    /// freshly computed value is still returned, and the job simply
    /// recomputes again next time (cache failures never fail a
    /// computation).
    pub fn get_or_compute(
        &self,
        key: &str,
        current_config: &TaggedValue,
        compute: impl FnOnce() -> TaggedValue,
    ) -> TaggedValue {
        self.with_key_lock(key, || {
            if let Some(cached) = self.fetch_if_valid(key, current_config) {
                return cached;
            }
            let result = compute();
            if let Err(e) = self.store(key, result.clone(), current_config.clone()) {
                warn!("job cache write failed, will recompute next run: {e}");
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_store_then_hit_with_matching_config() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JobCache::new(dir.path(), 100);
        let job = cache.job("phash").unwrap();

        let cfg = TaggedValue::bytes(vec![1, 2, 3]);
        assert!(job.fetch_if_valid("key1", &cfg).is_none());

        job.store("key1", TaggedValue::bytes(vec![9, 9]), cfg.clone()).unwrap();
        assert_eq!(job.fetch_if_valid("key1", &cfg), Some(TaggedValue::bytes(vec![9, 9])));
    }

    #[test]
    fn config_mismatch_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JobCache::new(dir.path(), 100);
        let job = cache.job("phash").unwrap();

        let cfg_a = TaggedValue::bytes(vec![1]);
        let cfg_b = TaggedValue::bytes(vec![2]);
        job.store("key1", TaggedValue::bytes(vec![9]), cfg_a).unwrap();

        assert!(job.fetch_if_valid("key1", &cfg_b).is_none());
    }

    #[test]
    fn get_or_compute_only_computes_once_per_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JobCache::new(dir.path(), 100);
        let job = cache.job("phash").unwrap();
        let cfg = TaggedValue::bytes(vec![1]);

        let calls = std::sync::atomic::AtomicU32::new(0);
        let compute = || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            TaggedValue::bytes(vec![42])
        };

        let first = job.get_or_compute("k", &cfg, compute);
        let second = job.get_or_compute("k", &cfg, compute);
        assert_eq!(first, second);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn job_opens_two_named_sub_databases() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JobCache::new(dir.path(), 1);
        let job = cache.job("fileStats").unwrap();
        job.store("k", TaggedValue::bytes(vec![1]), TaggedValue::bytes(vec![2])).unwrap();

        assert!(dir.path().join("fileStats_results.cache").exists());
        assert!(dir.path().join("fileStats_config.cache").exists());
    }

    #[test]
    fn reopening_job_cache_survives_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TaggedValue::bytes(vec![7]);
        {
            let cache = JobCache::new(dir.path(), 1);
            let job = cache.job("phash").unwrap();
            job.store("k", TaggedValue::bytes(vec![1]), cfg.clone()).unwrap();
        }
        {
            let cache = JobCache::new(dir.path(), 1);
            let job = cache.job("phash").unwrap();
            assert_eq!(job.fetch_if_valid("k", &cfg), Some(TaggedValue::bytes(vec![1])));
        }
    }
}
