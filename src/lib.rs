#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod error;
pub mod image;
pub mod mesh;
pub mod reconstruct;
pub mod types;

// Solver modules – public for callers that want one method directly,
// bypassing the facade's validation and normalization.
pub mod focus;
pub mod grid;
pub mod integrate;
pub mod shading;
pub mod stereo;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::ReconstructError;
pub use crate::image::ImageF32;
pub use crate::mesh::{build_mesh, Mesh, MeshParams};
pub use crate::reconstruct::{ReconParams, ReconstructionRequest, Reconstructor};
pub use crate::types::{
    ConfidenceMap, DepthMap, Method, NormalMap, ParamRecord, ReconstructionResult,
};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use surface_recon::prelude::*;
///
/// # fn main() {
/// let image = ImageF32::from_fn(64, 64, |x, y| ((x + y) % 16) as f32 / 16.0);
/// let recon = Reconstructor::new(ReconParams::default());
/// let result = recon
///     .process(ReconstructionRequest::shading(image))
///     .expect("valid input");
/// println!(
///     "depth mean {:.4} confidence {:.3} in {:.1} ms",
///     result.summary.depth_mean, result.summary.confidence_mean, result.elapsed_ms
/// );
/// # }
/// ```
pub mod prelude {
    pub use crate::image::ImageF32;
    pub use crate::mesh::{build_mesh, Mesh, MeshParams};
    pub use crate::types::{Method, ReconstructionResult};
    pub use crate::{ReconParams, ReconstructionRequest, Reconstructor};
}
