//! Shared per-pixel grid utilities.
//!
//! Gradient operators (Sobel, central difference), Laplacian and
//! Laplacian-of-Gaussian filters, sliding-window variance, and the
//! gradient→unit-normal conversion used by all three solvers. Borders are
//! handled by clamped indexing throughout, so every operator is total over
//! any non-empty image.

mod gradient;
mod normals;

pub use gradient::{
    central_gradients, depth_gradients, laplacian, laplacian_of_gaussian, sobel_gradients,
    window_variance, Grad,
};
pub use normals::normals_from_gradients;
