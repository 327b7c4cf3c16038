use std::path::{Path, PathBuf};

use crate::{FileStats, MediaInfo, Metadata};

/// Everything known about one file immediately after ingest: where it
/// lives, its content fingerprint, its embedded metadata and its
/// perceptual-hash frame sequence.
///
/// `FileInfo` is the transient, in-memory value produced by ingest; once
/// upserted it is owned by the metadata store as a [`crate::FileRecord`]
/// and this value can be dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub stats: FileStats,
    pub meta: Metadata,
    pub media: MediaInfo,
}

impl FileInfo {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, stats: FileStats, meta: Metadata, media: MediaInfo) -> Self {
        Self {
            path: path.into(),
            stats,
            meta,
            media,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media.is_image()
    }
}
