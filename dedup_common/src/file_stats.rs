use serde::{Deserialize, Serialize};

/// Above this size, the content fingerprint is computed from the head and
/// tail of the file rather than the whole thing. Chosen to keep ingest of
/// multi-gigabyte video files from being dominated by a single sequential
/// read; below it the cost of a full read is negligible.
pub const CONTENT_HASH_FULL_THRESHOLD_BYTES: u64 = 64 * 1024 * 1024;

/// A fast content fingerprint, the file's size and its filesystem
/// timestamps.
///
/// `content_hash` identifies the file's *bytes*, not its perceptual
/// content; two bit-identical copies of a photo hash equal here even
/// before either is ever perceptually hashed, which is what lets ingest
/// skip re-hashing unchanged files (see the job cache, §4.8).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    pub content_hash: Vec<u8>,
    pub size: u64,
    pub created_at: i64,
    pub modified_at: i64,
}

impl FileStats {
    #[must_use]
    pub fn new(content_hash: Vec<u8>, size: u64, created_at: i64, modified_at: i64) -> Self {
        Self {
            content_hash,
            size,
            created_at,
            modified_at,
        }
    }
}

/// Computes the content fingerprint for a file of the given `size`, given
/// access to the whole file or, for large files, just its head and tail.
///
/// This is the pure computation only; callers own the actual file reads
/// (this crate performs no I/O) and decide how large a head/tail slice to
/// provide via [`partial_read_len`]. Uses the default
/// [`CONTENT_HASH_FULL_THRESHOLD_BYTES`] cutoff; see
/// [`content_hash_with_threshold`] for the configurable `max_chunk_size`
/// variant the per-file processor uses.
#[must_use]
pub fn content_hash(size: u64, full_or_head: &[u8], tail: Option<&[u8]>) -> Vec<u8> {
    content_hash_with_threshold(size, CONTENT_HASH_FULL_THRESHOLD_BYTES, full_or_head, tail)
}

/// As [`content_hash`], but with the full/partial cutoff taken from the
/// caller (the `max_chunk_size` configuration option) rather than the
/// built-in default.
#[must_use]
pub fn content_hash_with_threshold(size: u64, threshold: u64, full_or_head: &[u8], tail: Option<&[u8]>) -> Vec<u8> {
    let mut hasher = md5::Context::new();
    hasher.consume(full_or_head);
    if size > threshold {
        if let Some(tail) = tail {
            hasher.consume(tail);
        }
    }
    hasher.compute().0.to_vec()
}

/// How many bytes from the head (and, symmetrically, the tail) of a file
/// past [`CONTENT_HASH_FULL_THRESHOLD_BYTES`] a caller should read before
/// calling [`content_hash`].
#[must_use]
pub fn partial_read_len(size: u64) -> u64 {
    partial_read_len_with_threshold(size, CONTENT_HASH_FULL_THRESHOLD_BYTES)
}

/// As [`partial_read_len`], but parameterized by `max_chunk_size`.
#[must_use]
pub fn partial_read_len_with_threshold(size: u64, threshold: u64) -> u64 {
    if size <= threshold {
        size
    } else {
        threshold / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_file_hashes_full_contents() {
        let data = b"a small file";
        let want = {
            let mut h = md5::Context::new();
            h.consume(data);
            h.compute().0.to_vec()
        };
        assert_eq!(content_hash(data.len() as u64, data, None), want);
    }

    #[test]
    fn partial_read_len_is_whole_file_below_threshold() {
        assert_eq!(partial_read_len(1024), 1024);
    }

    #[test]
    fn partial_read_len_is_half_threshold_above_it() {
        let size = CONTENT_HASH_FULL_THRESHOLD_BYTES * 4;
        assert_eq!(partial_read_len(size), CONTENT_HASH_FULL_THRESHOLD_BYTES / 2);
    }
}
