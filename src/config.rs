//! JSON runtime configuration for the demo binary.
//!
//! A config names the reconstruction mode with its input files, optional
//! solver parameter overrides, and output locations. Parameter sections may
//! be partial; anything omitted takes its default.

use crate::mesh::MeshParams;
use crate::reconstruct::ReconParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Where to write reports and artifacts. All outputs are optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JSON report with the method tag, parameter record and summary.
    pub json_out: Option<PathBuf>,
    /// Depth map rendered as a grayscale PNG heatmap.
    pub depth_png: Option<PathBuf>,
    /// Confidence map rendered as a grayscale PNG heatmap.
    pub confidence_png: Option<PathBuf>,
    /// ASCII STL of the meshed depth map.
    pub stl_out: Option<PathBuf>,
}

/// Reconstruction mode and its input files.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeConfig {
    Shading {
        image: PathBuf,
    },
    Stereo {
        reference: PathBuf,
        tilted: PathBuf,
    },
    FocusStack {
        images: Vec<PathBuf>,
        positions: Vec<f32>,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    pub mode: ModeConfig,
    #[serde(default)]
    pub params: ReconParams,
    #[serde(default)]
    pub mesh: MeshParams,
    #[serde(default)]
    pub output: OutputConfig,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}
