use super::Grad;
use crate::types::NormalMap;
use nalgebra::Vector3;

/// Convert surface gradients `(p, q)` into unit normals `normalize(-p, -q, 1)`.
///
/// The z component is fixed at 1 before normalization, so the norm is always
/// at least 1 and no zero-division guard is needed.
pub fn normals_from_gradients(grad: &Grad) -> NormalMap {
    let (w, h) = (grad.gx.w, grad.gx.h);
    debug_assert!(grad.gy.w == w && grad.gy.h == h);
    let mut data = Vec::with_capacity(w * h);
    for (&p, &q) in grad.gx.data.iter().zip(grad.gy.data.iter()) {
        data.push(Vector3::new(-p, -q, 1.0).normalize());
    }
    NormalMap { w, h, data }
}
