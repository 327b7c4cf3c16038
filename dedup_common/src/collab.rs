use std::path::Path;

use crate::DedupError;

/// Tags read from a file's embedded metadata, before the core's own
/// precedence and parsing rules are applied (see `dedup_core`'s metadata
/// sub-job). Every field may be absent; a concrete reader populates only
/// the tags it could find.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTags {
    pub date_time_original: Option<String>,
    pub create_date: Option<String>,
    pub media_create_date: Option<String>,
    pub image_width: Option<u32>,
    pub exif_image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub exif_image_height: Option<u32>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub model: Option<String>,
}

/// Reads a file's embedded metadata tags. A concrete implementation
/// wraps an external tool (EXIF reader, container-tag parser); this crate
/// and `dedup_phash` depend only on the trait.
pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<RawTags, DedupError>;
}

/// The frame-selection policy handed to a [`FrameSource`]: how many
/// frames to aim for, the fallback fixed interval, and the scene-change
/// sensitivity. Computed from `target_fps`/`min_frames`/`max_scene_frames`
/// by `dedup_phash`; a concrete frame source applies it during decode
/// (e.g. as an ffmpeg `select` filter expression) rather than decoding
/// every frame and filtering afterward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSelectPolicy {
    pub target_frames: u32,
    pub frame_interval_seconds: f64,
    pub scene_change_threshold: f64,
    pub min_gap_seconds: f64,
}

/// Decodes and selects frames from a video (or the single tile of an
/// image) at a given output resolution. A concrete implementation wraps
/// an external decoder; on any error the whole extraction fails rather
/// than returning a partial stream.
pub trait FrameSource: Send + Sync {
    fn probe_duration(&self, path: &Path) -> Result<f64, DedupError>;

    fn extract(
        &self,
        path: &Path,
        select: &FrameSelectPolicy,
        resolution: u32,
    ) -> Result<Vec<(f64, Vec<u8>)>, DedupError>;
}
