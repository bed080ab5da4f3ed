//! Input-validation errors surfaced by the [`crate::Reconstructor`] facade.
//!
//! Numerical degeneracies inside the solvers (flat focus windows, zero-norm
//! gradients, the zero-frequency bin of the integrator) never error; they
//! are regularized so every valid input produces a result. Only malformed
//! caller input is rejected.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("no input images supplied")]
    EmptyInput,

    #[error("input image {index} is {got_w}x{got_h}, expected {expected_w}x{expected_h}")]
    ShapeMismatch {
        index: usize,
        expected_w: usize,
        expected_h: usize,
        got_w: usize,
        got_h: usize,
    },

    #[error("{images} images supplied but {positions} focus positions")]
    FocusCountMismatch { images: usize, positions: usize },

    #[error("focus positions must be strictly increasing")]
    UnorderedFocusPositions,

    #[error("{0} images supplied; expected 1 (shading), 2 (stereo), or focus positions")]
    UnsupportedCardinality(usize),

    #[error("stereo block size must be odd, got {0}")]
    EvenBlockSize(usize),
}
