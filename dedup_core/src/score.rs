use dedup_common::FileInfo;
use dedup_store::FileRow;

/// The deterministic quality/completeness score from spec.md §4.3:
///
/// ```text
/// score  = (duration > 0 ? 10000 : 0)
///        + 100 * ln(max(1, duration + 1))
///        + (image_date present ? 2000 : 0)
///        + (gps_lat and gps_lon present ? 300 : 0)
///        + (camera_model present ? 200 : 0)
///        + sqrt(width * height)            [0 if either missing]
///        + 5 * ln(size + 1)
/// ```
///
/// Videos outrank stills by default (`+10000`); within a type, richer
/// metadata and higher resolution/size win. Every term is monotonic in
/// its input, so adding any optional field or increasing any numeric one
/// never decreases the score.
#[must_use]
pub fn score(info: &FileInfo) -> f64 {
    score_fields(
        info.media.duration,
        info.meta.image_date.is_some(),
        info.meta.has_gps(),
        info.meta.camera_model.is_some(),
        info.meta.pixel_count(),
        info.stats.size,
    )
}

/// The same formula computed directly off a persisted [`FileRow`], since
/// the duplicate detector scores the store's projection rather than a
/// freshly re-ingested `FileInfo`.
#[must_use]
pub fn score_row(row: &FileRow) -> f64 {
    let pixel_count = match (row.width, row.height) {
        (Some(w), Some(h)) => Some(u64::from(w) * u64::from(h)),
        _ => None,
    };
    score_fields(
        row.media_duration,
        row.image_date.is_some(),
        row.gps_lat.is_some() && row.gps_lon.is_some(),
        row.camera_model.is_some(),
        pixel_count,
        row.size,
    )
}

#[allow(clippy::fn_params_excessive_bools)]
fn score_fields(duration: f64, has_image_date: bool, has_gps: bool, has_camera_model: bool, pixel_count: Option<u64>, size: u64) -> f64 {
    let mut total = 0.0;
    if duration > 0.0 {
        total += 10000.0;
    }
    total += 100.0 * (duration + 1.0).max(1.0).ln();
    if has_image_date {
        total += 2000.0;
    }
    if has_gps {
        total += 300.0;
    }
    if has_camera_model {
        total += 200.0;
    }
    if let Some(pixels) = pixel_count {
        total += (pixels as f64).sqrt();
    }
    total += 5.0 * (size as f64 + 1.0).ln();
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use dedup_common::{FileStats, FrameHash, FrameInfo, MediaInfo, Metadata};

    fn base_info() -> FileInfo {
        FileInfo::new(
            "a.jpg",
            FileStats::new(vec![0u8; 16], 1000, 0, 0),
            Metadata::empty(),
            MediaInfo::new(0.0, vec![FrameInfo::new(Some(FrameHash::from_bytes(vec![0u8; 8])), 0.0)]),
        )
    }

    #[test]
    fn video_flag_strictly_increases_score() {
        let image = base_info();
        let mut video = base_info();
        video.media.duration = 10.0;
        assert!(score(&video) > score(&image));
    }

    #[test]
    fn increasing_duration_does_not_decrease_score() {
        let mut short = base_info();
        short.media.duration = 5.0;
        let mut long = base_info();
        long.media.duration = 50.0;
        assert!(score(&long) >= score(&short));
    }

    #[test]
    fn each_optional_metadata_field_increases_score() {
        let base = base_info();
        let base_score = score(&base);

        let mut with_date = base.clone();
        with_date.meta.image_date = Some(0);
        assert!(score(&with_date) > base_score);

        let mut with_gps = base.clone();
        with_gps.meta.gps_lat = Some(1.0);
        with_gps.meta.gps_lon = Some(1.0);
        assert!(score(&with_gps) > base_score);

        let mut with_camera = base.clone();
        with_camera.meta.camera_model = Some("Acme".to_string());
        assert!(score(&with_camera) > base_score);
    }

    #[test]
    fn increasing_resolution_does_not_decrease_score() {
        let mut small = base_info();
        small.meta.width = Some(100);
        small.meta.height = Some(100);
        let mut large = base_info();
        large.meta.width = Some(1000);
        large.meta.height = Some(1000);
        assert!(score(&large) >= score(&small));
    }

    #[test]
    fn increasing_size_does_not_decrease_score() {
        let mut small = base_info();
        small.stats.size = 100;
        let mut large = base_info();
        large.stats.size = 1_000_000;
        assert!(score(&large) >= score(&small));
    }
}
