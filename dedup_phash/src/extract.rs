use std::path::Path;

use dedup_common::{DedupError, FrameInfo, FrameSelectPolicy, FrameSource, MediaInfo};
use log::{debug, trace};

use crate::config::{FrameSelectConfig, HashConfig};
use crate::dct::hash_tile;

/// Builds the selection policy a [`FrameSource`] should apply while
/// decoding: `targetFrames = ceil(duration * target_fps)`, a base
/// interval of `duration / min(targetFrames, min_frames)` widened to at
/// least `1 / target_fps`, and the configured scene-change sensitivity.
#[must_use]
pub fn build_select_policy(duration: f64, cfg: &FrameSelectConfig) -> FrameSelectPolicy {
    let target_frames = (duration * cfg.target_fps).ceil().max(1.0) as u32;
    let denom = target_frames.min(cfg.min_frames).max(1);
    let base_interval = duration / f64::from(denom);
    let min_gap = 1.0 / cfg.target_fps;

    FrameSelectPolicy {
        target_frames,
        frame_interval_seconds: base_interval.max(min_gap),
        scene_change_threshold: cfg.scene_change_threshold,
        min_gap_seconds: min_gap,
    }
}

/// Hashes a single image tile into a one-frame [`MediaInfo`] at
/// `duration == 0`, `timestamp == 0`.
#[must_use]
pub fn hash_image(tile: &[u8], hash_cfg: &HashConfig) -> MediaInfo {
    let hash = hash_tile(tile, hash_cfg.resolution as usize, hash_cfg.hash_size as usize);
    MediaInfo::new(0.0, vec![FrameInfo::new(Some(hash), 0.0)])
}

/// Extracts and hashes a video's frames via the given [`FrameSource`],
/// applying the uniform-downsample fallback when the source selected
/// more frames than both `target_frames` and `max_scene_frames` call for.
pub fn hash_video(
    path: &Path,
    source: &dyn FrameSource,
    select_cfg: &FrameSelectConfig,
    hash_cfg: &HashConfig,
) -> Result<MediaInfo, DedupError> {
    let duration = source.probe_duration(path)?;
    let policy = build_select_policy(duration, select_cfg);

    let frames = source.extract(path, &policy, hash_cfg.resolution)?;
    let extracted = frames.len();
    let frames = downsample(frames, policy.target_frames, select_cfg.max_scene_frames);
    trace!(
        target: "frame_extraction",
        "{}: extracted {extracted} frame(s), kept {} after downsampling (target {})",
        path.display(),
        frames.len(),
        policy.target_frames,
    );
    if extracted > 0 && frames.len() < extracted {
        debug!(target: "frame_extraction", "{}: downsampled {extracted} -> {}", path.display(), frames.len());
    }

    let frame_infos = frames
        .into_iter()
        .map(|(timestamp, tile)| {
            let hash = hash_tile(&tile, hash_cfg.resolution as usize, hash_cfg.hash_size as usize);
            FrameInfo::new(Some(hash), timestamp)
        })
        .collect();

    Ok(MediaInfo::new(duration, frame_infos))
}

/// Uniformly strides a frame list down to `max(target_frames,
/// max_scene_frames)` entries when it overshoots both bounds, by taking
/// every `len / target`-th element (floor division).
fn downsample(frames: Vec<(f64, Vec<u8>)>, target_frames: u32, max_scene_frames: u32) -> Vec<(f64, Vec<u8>)> {
    let cap = target_frames.max(max_scene_frames) as usize;
    let len = frames.len();
    if len <= target_frames as usize || len <= max_scene_frames as usize || cap == 0 {
        return frames;
    }

    let stride = len / cap;
    if stride <= 1 {
        return frames;
    }

    frames
        .into_iter()
        .enumerate()
        .filter(|(i, _)| i % stride == 0)
        .map(|(_, f)| f)
        .take(cap)
        .collect()
}
