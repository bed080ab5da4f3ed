//! Shared result types for the three reconstruction methods.
//!
//! Every method produces the same record shape: a [`DepthMap`] in physical
//! units, a [`NormalMap`] of unit vectors, a [`ConfidenceMap`] in `[0, 1]`,
//! a [`Method`] tag and the parameter record actually used. Results are
//! assembled once and never mutated; callers wanting a refinement run the
//! solver again.

use crate::focus::FocusRecord;
use crate::image::ImageF32;
use crate::shading::ShadingRecord;
use crate::stereo::StereoRecord;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Which solver produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Shading,
    Stereo,
    FocusStack,
}

/// Per-pixel depth in physical length units, plus the lateral pixel size.
#[derive(Clone, Debug)]
pub struct DepthMap {
    pub data: ImageF32,
    /// Physical size of one pixel step in x and y.
    pub pixel_size: f32,
}

impl DepthMap {
    pub fn new(data: ImageF32, pixel_size: f32) -> Self {
        Self { data, pixel_size }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.w
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.h
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data.get(x, y)
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.data.min_max()
    }

    pub fn mean(&self) -> f32 {
        self.data.mean()
    }
}

/// Per-pixel unit surface normals in row-major order.
#[derive(Clone, Debug)]
pub struct NormalMap {
    pub w: usize,
    pub h: usize,
    pub data: Vec<Vector3<f32>>,
}

impl NormalMap {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Vector3<f32> {
        self.data[y * self.w + x]
    }
}

/// Per-pixel reconstruction reliability, clamped to `[0, 1]` on build.
#[derive(Clone, Debug)]
pub struct ConfidenceMap {
    data: ImageF32,
}

impl ConfidenceMap {
    /// Wrap a raw score image, clamping every value into `[0, 1]`.
    pub fn new(mut data: ImageF32) -> Self {
        for v in &mut data.data {
            *v = v.clamp(0.0, 1.0);
        }
        Self { data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data.get(x, y)
    }

    pub fn mean(&self) -> f32 {
        self.data.mean()
    }

    pub fn as_image(&self) -> &ImageF32 {
        &self.data
    }
}

/// The exact parameters a solver ran with, plus its telemetry.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamRecord {
    Shading(ShadingRecord),
    Stereo(StereoRecord),
    FocusStack(FocusRecord),
}

/// Scalar summary of a result, for JSON reports and UI legends.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResultSummary {
    pub width: usize,
    pub height: usize,
    pub depth_min: f32,
    pub depth_max: f32,
    pub depth_mean: f32,
    pub confidence_mean: f32,
}

/// Unified output of every reconstruction call.
///
/// The dense maps are skipped during serialization; the JSON view carries
/// the method tag, the parameter record and [`ResultSummary`] instead.
#[derive(Clone, Debug, Serialize)]
pub struct ReconstructionResult {
    #[serde(skip)]
    pub depth: DepthMap,
    #[serde(skip)]
    pub normals: NormalMap,
    #[serde(skip)]
    pub confidence: ConfidenceMap,
    pub method: Method,
    pub record: ParamRecord,
    pub summary: ResultSummary,
    pub elapsed_ms: f64,
}

impl ReconstructionResult {
    /// Assemble a result, computing the scalar summary from the maps.
    pub fn assemble(
        depth: DepthMap,
        normals: NormalMap,
        confidence: ConfidenceMap,
        method: Method,
        record: ParamRecord,
        elapsed_ms: f64,
    ) -> Self {
        let (depth_min, depth_max) = depth.min_max();
        let summary = ResultSummary {
            width: depth.width(),
            height: depth.height(),
            depth_min,
            depth_max,
            depth_mean: depth.mean(),
            confidence_mean: confidence.mean(),
        };
        Self {
            depth,
            normals,
            confidence,
            method,
            record,
            summary,
            elapsed_ms,
        }
    }
}
