use std::path::{Path, PathBuf};

use crate::{FileInfo, FileStats, MediaInfo, Metadata};

/// `FileInfo`, flattened for persistence, plus the exact-match and LSH
/// recall keys derived from its primary perceptual hash.
///
/// `path` is the primary key: re-ingesting a known path replaces its
/// record atomically rather than mutating it in place (see
/// `dedup_store`'s upsert).
#[derive(Clone, Debug, PartialEq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub stats: FileStats,
    pub meta: Metadata,
    pub media: MediaInfo,
    pub p_hash_hex: Option<String>,
    pub lsh1: Option<String>,
    pub lsh2: Option<String>,
    pub lsh3: Option<String>,
    pub lsh4: Option<String>,
}

impl FileRecord {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<FileInfo> for FileRecord {
    fn from(info: FileInfo) -> Self {
        let p_hash_hex = info.media.primary_hash().map(crate::FrameHash::to_hex);
        let [lsh1, lsh2, lsh3, lsh4] = match &p_hash_hex {
            Some(hex) => lsh_bands(hex),
            None => [None, None, None, None],
        };
        Self {
            path: info.path,
            stats: info.stats,
            meta: info.meta,
            media: info.media,
            p_hash_hex,
            lsh1,
            lsh2,
            lsh3,
            lsh4,
        }
    }
}

/// Splits a pHash hex string into four consecutive 4-hex-char band keys.
///
/// Only defined for a 16-hex-char (64-bit) hash; any other length yields
/// four `None`s rather than a panic, since a differently-sized hash is a
/// valid (if unindexed) configuration, not a bug.
#[must_use]
pub fn lsh_bands(p_hash_hex: &str) -> [Option<String>; 4] {
    if p_hash_hex.len() != 16 || !p_hash_hex.is_ascii() {
        return [None, None, None, None];
    }
    let mut bands: [Option<String>; 4] = [None, None, None, None];
    for (i, band) in bands.iter_mut().enumerate() {
        *band = Some(p_hash_hex[i * 4..i * 4 + 4].to_string());
    }
    bands
}
