use chrono::{Datelike, NaiveDateTime};
use dedup_common::{Metadata, RawTags};

/// Projects raw reader tags onto the core's [`Metadata`] struct, per
/// spec.md §6: first-present-wins date precedence, `YYYY:MM:DD HH:MM:SS`
/// normalization, and rejecting dates before 1980 as invalid (EXIF's
/// epoch predates consumer digital cameras, so a pre-1980 date usually
/// means a reader mis-parsed a non-date field).
#[must_use]
pub fn project_metadata(tags: &RawTags) -> Metadata {
    let image_date = [&tags.date_time_original, &tags.create_date, &tags.media_create_date]
        .into_iter()
        .find_map(|candidate| candidate.as_deref())
        .and_then(parse_exif_date);

    Metadata {
        image_date,
        width: tags.image_width.or(tags.exif_image_width),
        height: tags.image_height.or(tags.exif_image_height),
        gps_lat: tags.gps_latitude,
        gps_lon: tags.gps_longitude,
        camera_model: tags.model.clone(),
    }
}

fn parse_exif_date(raw: &str) -> Option<i64> {
    let normalized = normalize_colon_date(raw);
    let parsed = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S").ok()?;
    if parsed.year() < 1980 {
        return None;
    }
    Some(parsed.and_utc().timestamp())
}

/// `DateTimeOriginal` and friends use colons in the date portion too
/// (`2024:03:05 10:00:00`); only that leading date segment needs
/// normalizing to dashes before a standard parser can read it.
fn normalize_colon_date(raw: &str) -> String {
    match raw.split_once(' ') {
        Some((date_part, time_part)) => format!("{} {}", date_part.replace(':', "-"), time_part),
        None => raw.replace(':', "-"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_separated_exif_date() {
        let tags = RawTags {
            date_time_original: Some("2024:03:05 10:00:00".to_string()),
            ..Default::default()
        };
        let meta = project_metadata(&tags);
        assert!(meta.image_date.is_some());
    }

    #[test]
    fn rejects_dates_before_1980() {
        let tags = RawTags {
            date_time_original: Some("1970:01:01 00:00:00".to_string()),
            ..Default::default()
        };
        assert_eq!(project_metadata(&tags).image_date, None);
    }

    #[test]
    fn first_present_date_field_wins() {
        let tags = RawTags {
            date_time_original: None,
            create_date: Some("2020:01:01 00:00:00".to_string()),
            media_create_date: Some("2021:01:01 00:00:00".to_string()),
            ..Default::default()
        };
        let meta = project_metadata(&tags);
        let expected = parse_exif_date("2020:01:01 00:00:00").unwrap();
        assert_eq!(meta.image_date, Some(expected));
    }

    #[test]
    fn width_falls_back_to_exif_variant() {
        let tags = RawTags {
            exif_image_width: Some(100),
            exif_image_height: Some(200),
            ..Default::default()
        };
        let meta = project_metadata(&tags);
        assert_eq!(meta.width, Some(100));
        assert_eq!(meta.height, Some(200));
    }
}
