use serde::{Deserialize, Serialize};

/// A packed perceptual-hash bit vector. Conceptually 64 bits by default,
/// but the byte length is whatever the collection run's `hash_size`
/// configuration produced; all [`FrameHash`]es created within one run must
/// share the same length; comparing hashes of differing length is only
/// meaningful via [`dedup_hash`](https://docs.rs/dedup_hash)'s
/// length-tolerant distance kernel.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
pub struct FrameHash(Vec<u8>);

impl FrameHash {
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hex-encodes the hash, lowercase, two characters per byte. Used as
    /// the exact-match key (`p_hash_hex`) and the source for LSH band
    /// derivation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decodes a hex string produced by [`Self::to_hex`] back into a
    /// hash. Returns `None` on malformed input (odd length, non-hex
    /// characters) rather than panicking, since this is used to
    /// reconstruct hashes from store rows that a caller could hand-edit.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() % 2 != 0 {
            return None;
        }
        let mut bytes = Vec::with_capacity(hex.len() / 2);
        let chars: Vec<char> = hex.chars().collect();
        for pair in chars.chunks(2) {
            let byte_str: String = pair.iter().collect();
            bytes.push(u8::from_str_radix(&byte_str, 16).ok()?);
        }
        Some(Self(bytes))
    }
}

impl AsRef<[u8]> for FrameHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// One sampled frame: its perceptual hash (if extraction succeeded for
/// that frame) and its timestamp within the source media.
///
/// For images there is exactly one `FrameInfo` at `timestamp == 0.0`. For
/// videos, a finite, strictly-increasing-by-timestamp sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub hash: Option<FrameHash>,
    pub timestamp: f64,
}

impl FrameInfo {
    #[must_use]
    pub fn new(hash: Option<FrameHash>, timestamp: f64) -> Self {
        debug_assert!(timestamp >= 0.0);
        Self { hash, timestamp }
    }
}

/// The perceptual-hash side of a media item: its duration (0 for images)
/// and its frame sequence.
///
/// `duration == 0.0` iff the item is an image. Frames without a hash are
/// filtered out before any similarity computation runs over them; they are
/// kept in the struct only so callers can see which timestamps failed to
/// hash.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: f64,
    pub frames: Vec<FrameInfo>,
}

impl MediaInfo {
    #[must_use]
    pub fn new(duration: f64, frames: Vec<FrameInfo>) -> Self {
        Self { duration, frames }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.duration == 0.0
    }

    /// The frames that actually carry a hash, in timestamp order. This is
    /// the sequence every similarity function should iterate; frames that
    /// failed to hash are not errors (see spec §7) but carry no signal.
    pub fn hashed_frames(&self) -> impl Iterator<Item = (&FrameHash, f64)> {
        self.frames
            .iter()
            .filter_map(|f| f.hash.as_ref().map(|h| (h, f.timestamp)))
    }

    /// The single-frame hash of an image, or the first hashed frame of a
    /// video. Used to build `p_hash_hex` and the LSH bands.
    #[must_use]
    pub fn primary_hash(&self) -> Option<&FrameHash> {
        self.frames.iter().find_map(|f| f.hash.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips_known_bytes() {
        let h = FrameHash::from_bytes(vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11]);
        assert_eq!(h.to_hex(), "aabbccddeeff0011");
    }

    #[test]
    fn from_hex_round_trips_to_hex() {
        let h = FrameHash::from_bytes(vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11]);
        assert_eq!(FrameHash::from_hex(&h.to_hex()), Some(h));
    }

    #[test]
    fn from_hex_rejects_odd_length() {
        assert_eq!(FrameHash::from_hex("abc"), None);
    }

    #[test]
    fn image_media_info_has_zero_duration() {
        let hash = FrameHash::from_bytes(vec![0u8; 8]);
        let mi = MediaInfo::new(0.0, vec![FrameInfo::new(Some(hash), 0.0)]);
        assert!(mi.is_image());
    }

    #[test]
    fn media_info_round_trips_through_json_for_debug_reporting() {
        // The job cache and store both round-trip these types through bincode;
        // JSON is exercised separately since the out-of-scope HTML debug
        // reporter (spec.md §1) is expected to serialize a `MediaInfo` this way.
        let hash = FrameHash::from_bytes(vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11]);
        let mi = MediaInfo::new(3.5, vec![FrameInfo::new(Some(hash), 0.0), FrameInfo::new(None, 1.5)]);

        let json = serde_json::to_string(&mi).unwrap();
        let round_tripped: MediaInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(mi, round_tripped);
    }
}
