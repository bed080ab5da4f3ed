//! Single-image photometric reconstruction (shape-from-shading).
//!
//! Assumes Lambertian reflectance `I = ρ·(L·N)` with the normal expressed
//! through surface gradients, `N = normalize(-p, -q, 1)`. A Jacobi
//! relaxation recovers `(p, q)` from the observed irradiance: each interior
//! pixel averages its four axis neighbours from the previous full sweep and
//! takes a damped Newton step against the reflectance residual. The sweep is
//! double-buffered: updates read only the previous sweep's snapshot, never
//! partially updated values, which keeps results deterministic and
//! independent of traversal order.
//!
//! Boundary pixels are excluded from updates and stay at zero gradient.
//! This produces mild edge artifacts; downstream consumers are calibrated
//! against this behaviour, so it is kept rather than switching to
//! reflective boundaries.

use crate::grid::{normals_from_gradients, Grad};
use crate::image::ImageF32;
use crate::integrate::integrate_gradients;
use crate::types::{
    ConfidenceMap, DepthMap, Method, ParamRecord, ReconstructionResult,
};
use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const MIN_ALBEDO: f32 = 1e-6;

/// Shape-from-shading parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingParams {
    /// Direction of the incident light; normalized internally.
    pub light: Vector3<f32>,
    /// Surface albedo estimate in `(0, 1]`.
    pub albedo: f32,
    /// Smoothness weight λ damping each relaxation step (> 0).
    pub smoothness: f32,
    /// Sweep-to-sweep gradient change below which iteration stops.
    pub tolerance: f32,
    /// Iteration cap; hitting it is reported, not an error.
    pub max_iterations: usize,
    /// Physical size of one pixel step, used to scale the depth map.
    pub pixel_size: f32,
}

impl Default for ShadingParams {
    fn default() -> Self {
        Self {
            light: Vector3::new(0.0, 0.0, 1.0),
            albedo: 0.5,
            smoothness: 1.0,
            tolerance: 1e-4,
            max_iterations: 300,
            pixel_size: 1.0,
        }
    }
}

/// Parameters actually used plus solver telemetry.
#[derive(Clone, Debug, Serialize)]
pub struct ShadingRecord {
    pub light: Vector3<f32>,
    pub albedo: f32,
    pub smoothness: f32,
    pub tolerance: f32,
    pub max_iterations: usize,
    pub pixel_size: f32,
    /// Sweeps actually executed.
    pub iterations_run: usize,
    /// False when the iteration cap was hit before `tolerance`.
    pub converged: bool,
}

/// Reflectance map `R(p, q) = L·N` and its partials with respect to `p, q`.
#[derive(Clone, Copy)]
struct Reflectance {
    value: f32,
    d_p: f32,
    d_q: f32,
}

#[inline]
fn reflectance(light: &Vector3<f32>, p: f32, q: f32) -> Reflectance {
    let norm_sq = 1.0 + p * p + q * q;
    let norm = norm_sq.sqrt();
    let s = -light.x * p - light.y * q + light.z;
    let value = s / norm;
    Reflectance {
        value,
        d_p: -light.x / norm - s * p / (norm_sq * norm),
        d_q: -light.y / norm - s * q / (norm_sq * norm),
    }
}

/// Reconstruct a surface from a single normalized-intensity image.
///
/// `image` is expected in `[0, 1]`; the [`crate::Reconstructor`] facade
/// rescales raw inputs before calling this.
pub fn reconstruct(image: &ImageF32, params: &ShadingParams) -> ReconstructionResult {
    let start = Instant::now();
    let (w, h) = (image.w, image.h);
    let light = normalize_light(params.light);
    let albedo = params.albedo.clamp(MIN_ALBEDO, 1.0);
    let lambda = params.smoothness.max(f32::EPSILON);

    debug!(
        "shading start w={} h={} albedo={} max_iterations={}",
        w, h, albedo, params.max_iterations
    );

    // Observed irradiance normalized by albedo, the target for R(p, q).
    let target: Vec<f32> = image.data.iter().map(|&v| v / albedo).collect();

    let mut p_read = ImageF32::new(w, h);
    let mut q_read = ImageF32::new(w, h);
    let mut p_write = ImageF32::new(w, h);
    let mut q_write = ImageF32::new(w, h);

    let mut iterations_run = 0usize;
    let mut converged = false;
    if w >= 3 && h >= 3 {
        for iteration in 0..params.max_iterations {
            let max_delta = jacobi_sweep(
                &target,
                &light,
                lambda,
                &p_read,
                &q_read,
                &mut p_write,
                &mut q_write,
            );
            std::mem::swap(&mut p_read, &mut p_write);
            std::mem::swap(&mut q_read, &mut q_write);
            iterations_run = iteration + 1;
            if max_delta < params.tolerance {
                converged = true;
                break;
            }
        }
    } else {
        // Too small for interior updates; the zero gradient field stands.
        converged = true;
    }

    debug!(
        "shading done iterations={} converged={}",
        iterations_run, converged
    );

    let confidence = confidence_from_residual(image, &p_read, &q_read, &light, albedo);
    let grad = Grad {
        gx: p_read,
        gy: q_read,
    };
    let mut height = integrate_gradients(&grad);
    for v in &mut height.data {
        *v *= params.pixel_size;
    }

    let record = ShadingRecord {
        light,
        albedo,
        smoothness: lambda,
        tolerance: params.tolerance,
        max_iterations: params.max_iterations,
        pixel_size: params.pixel_size,
        iterations_run,
        converged,
    };

    ReconstructionResult::assemble(
        DepthMap::new(height, params.pixel_size),
        normals_from_gradients(&grad),
        confidence,
        Method::Shading,
        ParamRecord::Shading(record),
        start.elapsed().as_secs_f64() * 1000.0,
    )
}

fn normalize_light(light: Vector3<f32>) -> Vector3<f32> {
    let norm = light.norm();
    if norm <= f32::EPSILON {
        Vector3::new(0.0, 0.0, 1.0)
    } else {
        light / norm
    }
}

/// One full Jacobi sweep: read `(p, q)` from the previous snapshot, write
/// interior updates into the write buffers, return the largest per-pixel
/// change. Boundary rows/columns are never written and stay zero.
fn jacobi_sweep(
    target: &[f32],
    light: &Vector3<f32>,
    lambda: f32,
    p_read: &ImageF32,
    q_read: &ImageF32,
    p_write: &mut ImageF32,
    q_write: &mut ImageF32,
) -> f32 {
    let (w, h) = (p_read.w, p_read.h);

    let sweep_row = |y: usize, p_row: &mut [f32], q_row: &mut [f32]| -> f32 {
        let mut row_delta = 0.0f32;
        for x in 1..w - 1 {
            let p_avg = 0.25
                * (p_read.get(x - 1, y)
                    + p_read.get(x + 1, y)
                    + p_read.get(x, y - 1)
                    + p_read.get(x, y + 1));
            let q_avg = 0.25
                * (q_read.get(x - 1, y)
                    + q_read.get(x + 1, y)
                    + q_read.get(x, y - 1)
                    + q_read.get(x, y + 1));

            let refl = reflectance(light, p_avg, q_avg);
            let residual = target[y * w + x] - refl.value;
            // Damped Newton step; λ also guards the zero-norm gradient case.
            let denom = refl.d_p * refl.d_p + refl.d_q * refl.d_q + lambda;
            let step = residual / denom;

            let p_new = p_avg + step * refl.d_p;
            let q_new = q_avg + step * refl.d_q;
            row_delta = row_delta
                .max((p_new - p_read.get(x, y)).abs())
                .max((q_new - q_read.get(x, y)).abs());
            p_row[x] = p_new;
            q_row[x] = q_new;
        }
        row_delta
    };

    #[cfg(feature = "parallel")]
    {
        p_write
            .data
            .par_chunks_exact_mut(w)
            .zip(q_write.data.par_chunks_exact_mut(w))
            .enumerate()
            .filter(|(y, _)| *y >= 1 && *y < h - 1)
            .map(|(y, (p_row, q_row))| sweep_row(y, p_row, q_row))
            .reduce(|| 0.0f32, f32::max)
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut max_delta = 0.0f32;
        for y in 1..h - 1 {
            let p_row = &mut p_write.data[y * w..(y + 1) * w];
            let q_row = &mut q_write.data[y * w..(y + 1) * w];
            max_delta = max_delta.max(sweep_row(y, p_row, q_row));
        }
        max_delta
    }
}

/// `clamp(1 − |observed − ρ·R(p, q)|, 0, 1)` per pixel.
fn confidence_from_residual(
    image: &ImageF32,
    p: &ImageF32,
    q: &ImageF32,
    light: &Vector3<f32>,
    albedo: f32,
) -> ConfidenceMap {
    let (w, h) = (image.w, image.h);
    let mut scores = ImageF32::new(w, h);
    for i in 0..w * h {
        let refl = reflectance(light, p.data[i], q.data[i]);
        scores.data[i] = 1.0 - (image.data[i] - albedo * refl.value).abs();
    }
    ConfidenceMap::new(scores)
}
