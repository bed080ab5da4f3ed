//! Two-image geometric reconstruction from specimen tilt.
//!
//! A reference image and a second image captured after a known stage tilt
//! are block-matched along the x axis: for every pixel with a full block
//! window inside both images, the candidate disparity minimizing the
//! sum-of-squared-differences wins (winner-take-all, no occlusion or
//! uniqueness reasoning). A parabola through the SSD scores around the
//! winner refines the disparity to sub-pixel precision, except on perfect
//! or numerically degenerate matches where the integer winner stands.
//!
//! Pixel disparity converts to metric depth through the tilt geometry:
//! `depth = disparity · pixel_size / (2·sin(θ/2))`.

use crate::grid::{depth_gradients, laplacian_of_gaussian, normals_from_gradients};
use crate::image::ImageF32;
use crate::types::{ConfidenceMap, DepthMap, Method, ParamRecord, ReconstructionResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const SSD_PERFECT: f32 = 1e-10;
const CURVATURE_EPS: f32 = 1e-12;

/// Tilt-stereo parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoParams {
    /// Stage tilt between the two exposures, degrees.
    pub tilt_angle_deg: f32,
    /// Physical size of one pixel step.
    pub pixel_size: f32,
    /// Matching block edge length; must be odd.
    pub block_size: usize,
    /// Largest disparity searched, pixels.
    pub max_disparity: usize,
}

impl Default for StereoParams {
    fn default() -> Self {
        Self {
            tilt_angle_deg: 5.0,
            pixel_size: 1.0,
            block_size: 11,
            max_disparity: 32,
        }
    }
}

/// Parameters actually used plus matching telemetry.
#[derive(Clone, Debug, Serialize)]
pub struct StereoRecord {
    pub tilt_angle_deg: f32,
    pub pixel_size: f32,
    pub block_size: usize,
    pub max_disparity: usize,
    /// Pixels with a full matching window in both images.
    pub matched_pixels: usize,
}

/// Reconstruct a surface from a tilt pair. Both images must share one shape
/// and `block_size` must be odd; the facade validates both.
pub fn reconstruct(
    reference: &ImageF32,
    tilted: &ImageF32,
    params: &StereoParams,
) -> ReconstructionResult {
    let start = Instant::now();
    let (w, h) = (reference.w, reference.h);
    debug!(
        "stereo start w={} h={} block={} max_disparity={}",
        w, h, params.block_size, params.max_disparity
    );

    let disparity = match_blocks(reference, tilted, params);
    let matched_pixels = count_matched(w, h, params.block_size);

    let depth_scale = tilt_depth_scale(params.tilt_angle_deg, params.pixel_size);
    let depth_data = ImageF32::from_vec(
        w,
        h,
        disparity.data.iter().map(|&d| d * depth_scale).collect(),
    );
    let depth = DepthMap::new(depth_data, params.pixel_size);

    let confidence = confidence_map(reference, &disparity, params.max_disparity);
    let grad = depth_gradients(&depth);
    let normals = normals_from_gradients(&grad);

    let record = StereoRecord {
        tilt_angle_deg: params.tilt_angle_deg,
        pixel_size: params.pixel_size,
        block_size: params.block_size,
        max_disparity: params.max_disparity,
        matched_pixels,
    };

    ReconstructionResult::assemble(
        depth,
        normals,
        confidence,
        Method::Stereo,
        ParamRecord::Stereo(record),
        start.elapsed().as_secs_f64() * 1000.0,
    )
}

/// `pixel_size / (2·sin(θ/2))`, with the denominator floored so a zero tilt
/// degrades precision instead of erroring.
fn tilt_depth_scale(tilt_angle_deg: f32, pixel_size: f32) -> f32 {
    let half_angle = tilt_angle_deg.to_radians() / 2.0;
    pixel_size / (2.0 * half_angle.sin().abs().max(f32::EPSILON))
}

fn count_matched(w: usize, h: usize, block_size: usize) -> usize {
    let half = block_size / 2;
    if w < block_size || h < block_size {
        return 0;
    }
    (w - 2 * half) * (h - 2 * half)
}

/// Winner-take-all SSD disparity with parabolic sub-pixel refinement.
/// Pixels without a full window keep disparity zero.
fn match_blocks(reference: &ImageF32, tilted: &ImageF32, params: &StereoParams) -> ImageF32 {
    let (w, h) = (reference.w, reference.h);
    let half = params.block_size / 2;
    let mut disparity = ImageF32::new(w, h);
    if w < params.block_size || h < params.block_size {
        return disparity;
    }

    let match_row = |y: usize, out_row: &mut [f32]| {
        let mut scores = vec![0.0f32; params.max_disparity + 1];
        for x in half..w - half {
            // Candidate windows must fit inside the tilted image.
            let d_limit = params.max_disparity.min(w - 1 - half - x);
            let mut best_d = 0usize;
            let mut best_ssd = f32::INFINITY;
            for (d, slot) in scores.iter_mut().enumerate().take(d_limit + 1) {
                let ssd = block_ssd(reference, tilted, x, y, d, half);
                *slot = ssd;
                if ssd < best_ssd {
                    best_ssd = ssd;
                    best_d = d;
                }
            }
            out_row[x] = refine_disparity(&scores[..d_limit + 1], best_d, best_ssd);
        }
    };

    #[cfg(feature = "parallel")]
    disparity
        .data
        .par_chunks_exact_mut(w)
        .enumerate()
        .filter(|(y, _)| *y >= half && *y < h - half)
        .for_each(|(y, row)| match_row(y, row));

    #[cfg(not(feature = "parallel"))]
    for y in half..h - half {
        let row = &mut disparity.data[y * w..(y + 1) * w];
        match_row(y, row);
    }

    disparity
}

#[inline]
fn block_ssd(
    reference: &ImageF32,
    tilted: &ImageF32,
    x: usize,
    y: usize,
    d: usize,
    half: usize,
) -> f32 {
    let w = reference.w;
    let mut acc = 0.0f32;
    for dy in 0..=2 * half {
        let yy = y + dy - half;
        let ref_row = &reference.data[yy * w..(yy + 1) * w];
        let cand_row = &tilted.data[yy * w..(yy + 1) * w];
        for dx in 0..=2 * half {
            let xx = x + dx - half;
            let diff = ref_row[xx] - cand_row[xx + d];
            acc += diff * diff;
        }
    }
    acc
}

/// Parabola through the SSD scores at `best ± 1`. Falls back to the integer
/// winner when the winner sits at either end of the search range, when the
/// match is already perfect, or when the parabola degenerates.
fn refine_disparity(scores: &[f32], best: usize, best_ssd: f32) -> f32 {
    if best == 0 || best + 1 >= scores.len() || best_ssd <= SSD_PERFECT {
        return best as f32;
    }
    let s_minus = scores[best - 1];
    let s_plus = scores[best + 1];
    let curvature = s_minus - 2.0 * scores[best] + s_plus;
    if curvature.abs() <= CURVATURE_EPS {
        return best as f32;
    }
    let offset = (0.5 * (s_minus - s_plus) / curvature).clamp(-0.5, 0.5);
    best as f32 + offset
}

/// Texture strength (normalized |LoG| response) averaged with an
/// inverse-disparity-magnitude term, so low-texture or strongly displaced
/// regions score lower.
fn confidence_map(reference: &ImageF32, disparity: &ImageF32, max_disparity: usize) -> ConfidenceMap {
    let log_response = laplacian_of_gaussian(reference);
    let max_mag = log_response
        .data
        .iter()
        .fold(0.0f32, |m, &v| m.max(v.abs()))
        .max(f32::EPSILON);
    let d_max = (max_disparity as f32).max(1.0);

    let mut scores = ImageF32::new(reference.w, reference.h);
    for i in 0..scores.data.len() {
        let texture = log_response.data[i].abs() / max_mag;
        let displacement = 1.0 - disparity.data[i].abs() / d_max;
        scores.data[i] = 0.5 * (texture + displacement);
    }
    ConfidenceMap::new(scores)
}
