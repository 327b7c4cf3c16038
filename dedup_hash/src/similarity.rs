use dedup_common::{FrameHash, MediaInfo};

use crate::distance::hamming_distance;
use crate::config::WindowConfig;

/// Similarity between two single-frame hashes, in `[0, 1]` with 1 meaning
/// identical.
///
/// Returns 0 if either hash is missing (there is nothing to compare), and
/// 1 for a pair of zero-length hashes (an empty hash trivially matches
/// itself, and there is no bit on which it could disagree).
#[must_use]
pub fn image_similarity(a: Option<&FrameHash>, b: Option<&FrameHash>) -> f64 {
    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0.0,
    };
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let bits = a.len().max(b.len()) as f64 * 8.0;
    1.0 - f64::from(hamming_distance(a.as_bytes(), b.as_bytes())) / bits
}

/// Similarity between a single image hash and a video's frame sequence:
/// the maximum image↔image similarity against any of the video's hashed
/// frames, skipping frames with no hash. Scanning exits as soon as the
/// running maximum reaches `threshold`, since no later frame can raise an
/// already-accepted match.
#[must_use]
pub fn image_video_similarity(image_hash: Option<&FrameHash>, video: &MediaInfo, threshold: f64) -> f64 {
    let mut max = 0.0f64;
    for (frame_hash, _ts) in video.hashed_frames() {
        let sim = image_similarity(image_hash, Some(frame_hash));
        if sim > max {
            max = sim;
        }
        if max >= threshold {
            break;
        }
    }
    max
}

/// Similarity between two video frame sequences.
///
/// Slides a window, equal in duration to the shorter video, across the
/// longer video's timeline, stepping by `window.step_size_seconds`. Each
/// window's frames (timestamps in `[t, t + shorter.duration]`, both ends
/// inclusive) are compared against the whole shorter sequence via DTW,
/// and the maximum across windows is kept. Exits early once the running
/// maximum reaches `threshold`.
#[must_use]
pub fn video_video_similarity(a: &MediaInfo, b: &MediaInfo, window: WindowConfig, threshold: f64) -> f64 {
    let (shorter, longer) = if a.duration <= b.duration { (a, b) } else { (b, a) };

    let shorter_hashes: Vec<FrameHash> = shorter.hashed_frames().map(|(h, _)| h.clone()).collect();
    if shorter_hashes.is_empty() {
        return 0.0;
    }

    let longer_frames: Vec<(f64, &FrameHash)> = longer.hashed_frames().map(|(h, t)| (t, h)).collect();
    if longer_frames.is_empty() {
        return 0.0;
    }

    let window_duration = shorter.duration;
    let step = window.step_size_seconds.max(1.0);
    let last_start = (longer.duration - window_duration).max(0.0);

    let mut max = 0.0f64;
    let mut t = 0.0f64;
    loop {
        let window_end = t + window_duration;
        let window_hashes: Vec<FrameHash> = longer_frames
            .iter()
            .filter(|(ts, _)| *ts >= t && *ts <= window_end)
            .map(|(_, h)| (*h).clone())
            .collect();

        if !window_hashes.is_empty() {
            let sim = dtw_similarity(&shorter_hashes, &window_hashes);
            if sim > max {
                max = sim;
            }
            if max >= threshold {
                break;
            }
        }

        if t >= last_start {
            break;
        }
        t = (t + step).min(last_start);
    }

    max
}

/// Dynamic time warping similarity between two hashed frame sequences.
///
/// Per-cell cost is `max(0, 1 - image_similarity(f_i, g_j))`; the
/// alignment cost is computed with a rolling two-row array (`O(min(m,n))`
/// memory) rather than a full `m*n` matrix. The final similarity is
/// `max(0, 1 - dtw[m][n] / max(m,n))`; an empty/empty pair is defined as
/// 1, any other emptiness as 0.
#[must_use]
pub fn dtw_similarity(f: &[FrameHash], g: &[FrameHash]) -> f64 {
    if f.is_empty() && g.is_empty() {
        return 1.0;
    }
    if f.is_empty() || g.is_empty() {
        return 0.0;
    }

    // Put the shorter sequence along rows so the rolling row has the
    // smaller width.
    let (rows, cols) = if f.len() <= g.len() { (f, g) } else { (g, f) };
    let m = rows.len();
    let n = cols.len();

    const INF: f64 = f64::INFINITY;
    let mut prev = vec![INF; n + 1];
    let mut cur = vec![INF; n + 1];
    prev[0] = 0.0;

    for i in 1..=m {
        cur[0] = INF;
        for j in 1..=n {
            let cost = (1.0 - image_similarity(Some(&rows[i - 1]), Some(&cols[j - 1]))).max(0.0);
            let best_prior = prev[j].min(cur[j - 1]).min(prev[j - 1]);
            cur[j] = cost + best_prior;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let dtw_final = prev[n];
    (1.0 - dtw_final / (m.max(n) as f64)).max(0.0)
}
