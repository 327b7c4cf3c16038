/// How a video's frames are chosen for hashing. Defaults match the
/// frame-extractor's recognized options.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameSelectConfig {
    pub target_fps: f64,
    pub min_frames: u32,
    pub max_scene_frames: u32,
    pub scene_change_threshold: f64,
}

impl Default for FrameSelectConfig {
    fn default() -> Self {
        Self {
            target_fps: 0.5,
            min_frames: 15,
            max_scene_frames: 200,
            scene_change_threshold: 0.01,
        }
    }
}

/// Tile resolution and hash grid dimension used to build a perceptual
/// hash.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HashConfig {
    pub resolution: u32,
    pub hash_size: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            hash_size: 8,
        }
    }
}
