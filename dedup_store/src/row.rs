use std::path::{Path, PathBuf};

use dedup_common::{lsh_bands, FileInfo};

/// The persisted projection of a [`FileInfo`]: every column in the
/// `files` table. Note this is strictly smaller than `FileInfo` — the
/// per-frame hash sequence itself is not persisted, only the primary
/// pHash and the video duration. Full per-frame sequences exist only
/// transiently during per-file processing; the duplicate detector
/// operates on this "minimal" projection (see `media_info_for`).
#[derive(Clone, Debug, PartialEq)]
pub struct FileRow {
    pub path: PathBuf,
    pub content_hash_hex: String,
    pub size: u64,
    pub created_at_millis: i64,
    pub modified_at_millis: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub camera_model: Option<String>,
    pub image_date: Option<i64>,
    pub media_duration: f64,
    pub p_hash_hex: Option<String>,
    pub lsh1: Option<String>,
    pub lsh2: Option<String>,
    pub lsh3: Option<String>,
    pub lsh4: Option<String>,
}

/// The thin `(p_hash, duration)` projection `media_info_for` returns.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaSummary {
    pub p_hash_hex: Option<String>,
    pub duration: f64,
}

impl FileRow {
    #[must_use]
    pub fn media_summary(&self) -> MediaSummary {
        MediaSummary {
            p_hash_hex: self.p_hash_hex.clone(),
            duration: self.media_duration,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<&FileInfo> for FileRow {
    fn from(info: &FileInfo) -> Self {
        let p_hash_hex = info.media.primary_hash().map(dedup_common::FrameHash::to_hex);
        let [lsh1, lsh2, lsh3, lsh4] = match &p_hash_hex {
            Some(hex) => lsh_bands(hex),
            None => [None, None, None, None],
        };

        Self {
            path: info.path.clone(),
            content_hash_hex: info.stats.content_hash.iter().map(|b| format!("{b:02x}")).collect(),
            size: info.stats.size,
            created_at_millis: info.stats.created_at,
            modified_at_millis: info.stats.modified_at,
            width: info.meta.width,
            height: info.meta.height,
            gps_lat: info.meta.gps_lat,
            gps_lon: info.meta.gps_lon,
            camera_model: info.meta.camera_model.clone(),
            image_date: info.meta.image_date,
            media_duration: info.media.duration,
            p_hash_hex,
            lsh1,
            lsh2,
            lsh3,
            lsh4,
        }
    }
}
