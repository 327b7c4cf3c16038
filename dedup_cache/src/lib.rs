//! Content-addressed job cache.
//!
//! Generalizes the filesystem-cache idiom (batched in-memory writes,
//! write-temp-then-rename durability) to memoize per-file subjob results
//! keyed by content hash instead of path/mtime, with an explicit
//! config-validity check replacing mtime staleness.

mod job_cache;
mod payload;
mod store;

pub use job_cache::{JobCache, JobStore};
pub use payload::TaggedValue;
pub use store::{decode_or_warn, BaseFsCache};
