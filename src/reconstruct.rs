//! Reconstruction facade: validation, normalization, dispatch.
//!
//! The [`Reconstructor`] accepts a [`ReconstructionRequest`] and routes it
//! by input cardinality: a single image runs shape-from-shading, two
//! same-shaped images run tilt stereo, and any number of images paired with
//! a focus-position list runs focus stacking. Intensities are brought into
//! `[0, 1]` before dispatch; images already in that range pass through
//! untouched so constant fields keep their level.
//!
//! Typical usage:
//! ```no_run
//! use surface_recon::prelude::*;
//! # fn example(image: surface_recon::ImageF32) {
//! let recon = Reconstructor::new(ReconParams::default());
//! let result = recon.process(ReconstructionRequest::shading(image)).unwrap();
//! println!("mean confidence {:.3}", result.summary.confidence_mean);
//! # }
//! ```

use crate::error::ReconstructError;
use crate::focus::{self, FocusParams};
use crate::image::ImageF32;
use crate::shading::{self, ShadingParams};
use crate::stereo::{self, StereoParams};
use crate::types::ReconstructionResult;
use log::debug;
use serde::{Deserialize, Serialize};

/// Per-method parameters for the facade.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconParams {
    pub shading: ShadingParams,
    pub stereo: StereoParams,
    pub focus: FocusParams,
}

/// One reconstruction call's input: intensity images plus, for focus
/// stacking, a parallel list of focus positions.
#[derive(Clone, Debug)]
pub struct ReconstructionRequest {
    pub images: Vec<ImageF32>,
    pub focus_positions: Option<Vec<f32>>,
}

impl ReconstructionRequest {
    /// Single-image photometric reconstruction.
    pub fn shading(image: ImageF32) -> Self {
        Self {
            images: vec![image],
            focus_positions: None,
        }
    }

    /// Two-image tilt-stereo reconstruction.
    pub fn stereo(reference: ImageF32, tilted: ImageF32) -> Self {
        Self {
            images: vec![reference, tilted],
            focus_positions: None,
        }
    }

    /// Ordered focus stack with one physical focus position per image.
    pub fn focus_stack(images: Vec<ImageF32>, positions: Vec<f32>) -> Self {
        Self {
            images,
            focus_positions: Some(positions),
        }
    }
}

/// Facade dispatching to the three reconstruction methods.
pub struct Reconstructor {
    params: ReconParams,
}

impl Reconstructor {
    pub fn new(params: ReconParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ReconParams {
        &self.params
    }

    /// Validate, normalize and dispatch one request.
    pub fn process(
        &self,
        request: ReconstructionRequest,
    ) -> Result<ReconstructionResult, ReconstructError> {
        if request.images.is_empty() {
            return Err(ReconstructError::EmptyInput);
        }
        let (w, h) = (request.images[0].w, request.images[0].h);
        for (index, img) in request.images.iter().enumerate().skip(1) {
            if !img.same_shape(&request.images[0]) {
                return Err(ReconstructError::ShapeMismatch {
                    index,
                    expected_w: w,
                    expected_h: h,
                    got_w: img.w,
                    got_h: img.h,
                });
            }
        }

        if let Some(positions) = &request.focus_positions {
            return self.run_focus_stack(&request.images, positions);
        }

        match request.images.len() {
            1 => {
                debug!("dispatch method=shading w={} h={}", w, h);
                let image = to_unit_range(&request.images[0]);
                Ok(shading::reconstruct(&image, &self.params.shading))
            }
            2 => {
                if self.params.stereo.block_size % 2 == 0 {
                    return Err(ReconstructError::EvenBlockSize(
                        self.params.stereo.block_size,
                    ));
                }
                debug!("dispatch method=stereo w={} h={}", w, h);
                let reference = to_unit_range(&request.images[0]);
                let tilted = to_unit_range(&request.images[1]);
                Ok(stereo::reconstruct(&reference, &tilted, &self.params.stereo))
            }
            n => Err(ReconstructError::UnsupportedCardinality(n)),
        }
    }

    fn run_focus_stack(
        &self,
        images: &[ImageF32],
        positions: &[f32],
    ) -> Result<ReconstructionResult, ReconstructError> {
        if positions.len() != images.len() {
            return Err(ReconstructError::FocusCountMismatch {
                images: images.len(),
                positions: positions.len(),
            });
        }
        if positions.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(ReconstructError::UnorderedFocusPositions);
        }
        debug!(
            "dispatch method=focus_stack stack={} w={} h={}",
            images.len(),
            images[0].w,
            images[0].h
        );
        let normalized: Vec<ImageF32> = images.iter().map(to_unit_range).collect();
        Ok(focus::reconstruct(&normalized, positions, &self.params.focus))
    }
}

/// Rescale into `[0, 1]` only when values fall outside it, so inputs that
/// are already normalized (including constant fields) pass through as-is.
fn to_unit_range(img: &ImageF32) -> ImageF32 {
    let (lo, hi) = img.min_max();
    if lo >= 0.0 && hi <= 1.0 {
        img.clone()
    } else {
        img.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Method;

    fn image(w: usize, h: usize) -> ImageF32 {
        ImageF32::from_fn(w, h, |x, y| ((x * 7 + y * 3) % 11) as f32 / 11.0)
    }

    #[test]
    fn empty_input_is_rejected() {
        let recon = Reconstructor::new(ReconParams::default());
        let request = ReconstructionRequest {
            images: Vec::new(),
            focus_positions: None,
        };
        assert_eq!(
            recon.process(request).unwrap_err(),
            ReconstructError::EmptyInput
        );
    }

    #[test]
    fn mismatched_stereo_shapes_are_rejected() {
        let recon = Reconstructor::new(ReconParams::default());
        let request = ReconstructionRequest::stereo(image(16, 16), image(16, 12));
        match recon.process(request).unwrap_err() {
            ReconstructError::ShapeMismatch { index, got_h, .. } => {
                assert_eq!(index, 1);
                assert_eq!(got_h, 12);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn focus_position_count_must_match() {
        let recon = Reconstructor::new(ReconParams::default());
        let request =
            ReconstructionRequest::focus_stack(vec![image(8, 8), image(8, 8)], vec![0.0]);
        assert_eq!(
            recon.process(request).unwrap_err(),
            ReconstructError::FocusCountMismatch {
                images: 2,
                positions: 1
            }
        );
    }

    #[test]
    fn focus_positions_must_increase() {
        let recon = Reconstructor::new(ReconParams::default());
        let request = ReconstructionRequest::focus_stack(
            vec![image(8, 8), image(8, 8)],
            vec![10.0, 10.0],
        );
        assert_eq!(
            recon.process(request).unwrap_err(),
            ReconstructError::UnorderedFocusPositions
        );
    }

    #[test]
    fn three_images_without_positions_are_unsupported() {
        let recon = Reconstructor::new(ReconParams::default());
        let request = ReconstructionRequest {
            images: vec![image(8, 8); 3],
            focus_positions: None,
        };
        assert_eq!(
            recon.process(request).unwrap_err(),
            ReconstructError::UnsupportedCardinality(3)
        );
    }

    #[test]
    fn even_block_size_is_rejected() {
        let mut params = ReconParams::default();
        params.stereo.block_size = 8;
        let recon = Reconstructor::new(params);
        let request = ReconstructionRequest::stereo(image(32, 32), image(32, 32));
        assert_eq!(
            recon.process(request).unwrap_err(),
            ReconstructError::EvenBlockSize(8)
        );
    }

    #[test]
    fn cardinality_dispatch_tags_methods() {
        let recon = Reconstructor::new(ReconParams::default());

        let shading = recon
            .process(ReconstructionRequest::shading(image(16, 16)))
            .unwrap();
        assert_eq!(shading.method, Method::Shading);

        let stereo = recon
            .process(ReconstructionRequest::stereo(image(32, 32), image(32, 32)))
            .unwrap();
        assert_eq!(stereo.method, Method::Stereo);

        let focus = recon
            .process(ReconstructionRequest::focus_stack(
                vec![image(16, 16), image(16, 16), image(16, 16)],
                vec![0.0, 1.0, 2.0],
            ))
            .unwrap();
        assert_eq!(focus.method, Method::FocusStack);
    }

    #[test]
    fn out_of_range_intensities_are_rescaled() {
        let raw = ImageF32::from_fn(8, 8, |x, _| x as f32 * 40.0);
        let unit = to_unit_range(&raw);
        assert_eq!(unit.min_max(), (0.0, 1.0));

        let already = ImageF32::from_fn(8, 8, |_, _| 0.5);
        assert_eq!(to_unit_range(&already).get(3, 3), 0.5);
    }
}
