use ndarray::Array2;
use rustdct::DctPlanner;

use dedup_common::FrameHash;

/// Applies a 2D DCT-II to an `R×R` grayscale tile, keeps the
/// `hash_size × hash_size` lowest-frequency corner (scaled by the
/// separable DCT-II normalization factors so every frequency index is on
/// the same footing), and thresholds it against the median of its AC
/// coefficients (every coefficient except the DC term at index 0) to
/// produce a packed perceptual hash.
///
/// Mirrors the teacher's `raw_dct_ops::dct_2d`/`dct_3d`: a row-wise DCT
/// pass, an in-memory transpose (`rustdct` requires row-major contiguous
/// data, so `ndarray`'s stride-only transpose can't be used directly), a
/// column-wise pass, then transposing back. `rustdct::process_dct2`
/// itself is unnormalized, so unlike the teacher (which only ever
/// thresholds against a global min/max-normalized average, both
/// invariant to a uniform rescale) this hash applies the `nf[u] * nf[v]`
/// scaling from spec.md §4.6.1 explicitly before taking the per-frame AC
/// median: `nf[0] = sqrt(2/R)/sqrt(2)` is smaller than `nf[i>0] =
/// sqrt(2/R)`, and skipping it would leave the first row/column of AC
/// coefficients a factor of `sqrt(2)` too large relative to the interior
/// ones, shifting the median and flipping borderline bits.
#[must_use]
pub fn hash_tile(tile: &[u8], resolution: usize, hash_size: usize) -> FrameHash {
    assert_eq!(tile.len(), resolution * resolution);

    let centered: Vec<f64> = tile.iter().map(|&p| f64::from(p) - 128.0).collect();
    let matrix = Array2::from_shape_vec((resolution, resolution), centered).expect("tile is resolution x resolution");

    let coeffs = dct_2d(&matrix, resolution);
    let nf = normalization_factors(resolution, hash_size);
    let corner = top_left_corner(&coeffs, resolution, hash_size, &nf);

    let ac: Vec<f64> = corner.iter().copied().skip(1).map(f64::abs).collect();
    let median = if ac.is_empty() { 0.0 } else { quickselect_median(ac) };

    let mut bytes = vec![0u8; hash_size.pow(2).div_ceil(8)];
    for (i, &coeff) in corner.iter().enumerate() {
        if coeff > median {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }

    FrameHash::from_bytes(bytes)
}

/// `nf[0] = sqrt(2/R)/sqrt(2)`, `nf[i>0] = sqrt(2/R)`, one per kept
/// frequency index `0..hash_size`, per spec.md §4.6.1.
fn normalization_factors(resolution: usize, hash_size: usize) -> Vec<f64> {
    let base = (2.0 / resolution as f64).sqrt();
    (0..hash_size.min(resolution))
        .map(|i| if i == 0 { base / std::f64::consts::SQRT_2 } else { base })
        .collect()
}

fn dct_2d(matrix: &Array2<f64>, n: usize) -> Array2<f64> {
    let mut matrix = matrix.clone();
    let mut planner = DctPlanner::new();
    let dct = planner.plan_dct2(n);

    matrix.rows_mut().into_iter().for_each(|mut row| {
        dct.process_dct2(row.as_slice_mut().expect("row is contiguous"));
    });

    matrix = transpose(matrix, n);

    matrix.rows_mut().into_iter().for_each(|mut row| {
        dct.process_dct2(row.as_slice_mut().expect("row is contiguous"));
    });

    transpose(matrix, n)
}

/// `rustdct` requires row-major contiguous memory; `ndarray`'s
/// `reversed_axes` only changes strides, so the transpose has to copy.
fn transpose(matrix: Array2<f64>, n: usize) -> Array2<f64> {
    Array2::from_shape_vec((n, n), matrix.reversed_axes().iter().copied().collect()).expect("unreachable")
}

/// Crops the lowest `hash_size × hash_size` corner, applying the
/// separable `nf[row] * nf[col]` scale to each kept coefficient.
fn top_left_corner(matrix: &Array2<f64>, resolution: usize, hash_size: usize, nf: &[f64]) -> Vec<f64> {
    let kept = hash_size.min(resolution);
    let mut out = Vec::with_capacity(kept * kept);
    for row in 0..kept {
        for col in 0..kept {
            out.push(matrix[[row, col]] * nf[row] * nf[col]);
        }
    }
    out
}

/// Median-of-N via Quickselect; avoids a full `O(n log n)` sort for what
/// is, per hash, typically a few dozen to a few hundred values.
fn quickselect_median(mut values: Vec<f64>) -> f64 {
    let n = values.len();
    let mid = n / 2;
    let (_, median_val, _) = values.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).expect("no NaNs in DCT output"));
    if n % 2 == 1 {
        *median_val
    } else {
        let lower = values[..mid]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        (lower + values[mid]) / 2.0
    }
}
