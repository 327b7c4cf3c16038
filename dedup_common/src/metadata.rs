use serde::{Deserialize, Serialize};

/// Metadata pulled from a file's embedded tags (EXIF for images, container
/// tags for video). Every field is optional: any of them can be absent,
/// malformed, or simply not supported by the source format.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Capture or creation timestamp as recorded in the file's own tags,
    /// not the filesystem timestamps in [`crate::FileStats`].
    pub image_date: Option<i64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub gps_lat: Option<f64>,
    pub gps_lon: Option<f64>,
    pub camera_model: Option<String>,
}

impl Metadata {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_gps(&self) -> bool {
        self.gps_lat.is_some() && self.gps_lon.is_some()
    }

    #[must_use]
    pub fn pixel_count(&self) -> Option<u64> {
        Some(u64::from(self.width?) * u64::from(self.height?))
    }
}
