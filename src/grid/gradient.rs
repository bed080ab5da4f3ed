use crate::image::ImageF32;
use crate::types::DepthMap;

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

// Sum of |weights| along one axis; divides Sobel responses back to
// units of value-per-pixel-step.
const SOBEL_NORM: f32 = 8.0;

const LAPLACIAN_KERNEL: Kernel3 = [[0.0, 1.0, 0.0], [1.0, -4.0, 1.0], [0.0, 1.0, 0.0]];

// 5-tap binomial approximation of a sigma≈1 Gaussian.
const GAUSS5: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

/// Paired x/y gradient fields of one image.
#[derive(Clone, Debug)]
pub struct Grad {
    pub gx: ImageF32,
    pub gy: ImageF32,
}

#[inline]
fn clamp_index(idx: isize, upper: usize) -> usize {
    if upper == 0 {
        return 0;
    }
    if idx < 0 {
        0
    } else if (idx as usize) >= upper {
        upper - 1
    } else {
        idx as usize
    }
}

fn convolve3(l: &ImageF32, kernel: &Kernel3) -> ImageF32 {
    let (w, h) = (l.w, l.h);
    let mut out = ImageF32::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let dst = out.row_mut(y);
        for (x, dst_px) in dst.iter_mut().enumerate() {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
            let mut acc = 0.0f32;
            for (ky, &yy) in y_idx.iter().enumerate() {
                let kernel_row = &kernel[ky];
                for (&xx, &weight) in x_idx.iter().zip(kernel_row.iter()) {
                    acc += l.get(xx, yy) * weight;
                }
            }
            *dst_px = acc;
        }
    }
    out
}

/// Sobel x/y gradients in units of value-per-pixel-step.
pub fn sobel_gradients(l: &ImageF32) -> Grad {
    let mut gx = convolve3(l, &SOBEL_KERNEL_X);
    let mut gy = convolve3(l, &SOBEL_KERNEL_Y);
    for v in gx.data.iter_mut().chain(gy.data.iter_mut()) {
        *v /= SOBEL_NORM;
    }
    Grad { gx, gy }
}

/// Central-difference x/y gradients in units of value-per-pixel-step.
/// Falls back to one-sided differences on the image border.
pub fn central_gradients(l: &ImageF32) -> Grad {
    let (w, h) = (l.w, l.h);
    let mut gx = ImageF32::new(w, h);
    let mut gy = ImageF32::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let xm = clamp_index(x as isize - 1, w);
            let xp = clamp_index(x as isize + 1, w);
            let ym = clamp_index(y as isize - 1, h);
            let yp = clamp_index(y as isize + 1, h);
            let dx = (xp - xm).max(1) as f32;
            let dy = (yp - ym).max(1) as f32;
            gx.set(x, y, (l.get(xp, y) - l.get(xm, y)) / dx);
            gy.set(x, y, (l.get(x, yp) - l.get(x, ym)) / dy);
        }
    }
    Grad { gx, gy }
}

/// Surface gradients `(∂Z/∂x, ∂Z/∂y)` of a depth map, in depth units per
/// physical length unit.
pub fn depth_gradients(depth: &DepthMap) -> Grad {
    let mut grad = sobel_gradients(&depth.data);
    let inv_px = 1.0 / depth.pixel_size.max(f32::EPSILON);
    for v in grad.gx.data.iter_mut().chain(grad.gy.data.iter_mut()) {
        *v *= inv_px;
    }
    grad
}

/// 4-neighbour Laplacian response.
pub fn laplacian(l: &ImageF32) -> ImageF32 {
    convolve3(l, &LAPLACIAN_KERNEL)
}

/// Laplacian of a Gaussian-smoothed image: a band-pass texture response.
pub fn laplacian_of_gaussian(l: &ImageF32) -> ImageF32 {
    laplacian(&gaussian5(l))
}

fn gaussian5(l: &ImageF32) -> ImageF32 {
    let (w, h) = (l.w, l.h);
    let mut horiz = ImageF32::new(w, h);
    for y in 0..h {
        let src = l.row(y);
        let dst = horiz.row_mut(y);
        for (x, dst_px) in dst.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &tap) in GAUSS5.iter().enumerate() {
                let idx = clamp_index(x as isize + k as isize - 2, w);
                acc += tap * src[idx];
            }
            *dst_px = acc;
        }
    }
    let mut out = ImageF32::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &tap) in GAUSS5.iter().enumerate() {
                let idx = clamp_index(y as isize + k as isize - 2, h);
                acc += tap * horiz.get(x, idx);
            }
            out.set(x, y, acc);
        }
    }
    out
}

/// Local variance over a `(2·radius+1)²` sliding window, clamped at borders.
pub fn window_variance(l: &ImageF32, radius: usize) -> ImageF32 {
    let (w, h) = (l.w, l.h);
    let mut out = ImageF32::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    let r = radius as isize;
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0f64;
            let mut sum_sq = 0.0f64;
            let mut count = 0.0f64;
            for dy in -r..=r {
                let yy = clamp_index(y as isize + dy, h);
                for dx in -r..=r {
                    let xx = clamp_index(x as isize + dx, w);
                    let v = l.get(xx, yy) as f64;
                    sum += v;
                    sum_sq += v * v;
                    count += 1.0;
                }
            }
            let mean = sum / count;
            out.set(x, y, (sum_sq / count - mean * mean).max(0.0) as f32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sobel_recovers_linear_ramp_slope() {
        let img = ImageF32::from_fn(8, 8, |x, _| 0.5 * x as f32);
        let grad = sobel_gradients(&img);
        // Interior pixels see the exact slope; borders are clamped.
        for y in 1..7 {
            for x in 1..7 {
                assert_relative_eq!(grad.gx.get(x, y), 0.5, epsilon = 1e-5);
                assert_relative_eq!(grad.gy.get(x, y), 0.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn central_difference_matches_analytic_slope() {
        let img = ImageF32::from_fn(10, 10, |x, y| 0.25 * x as f32 - 0.75 * y as f32);
        let grad = central_gradients(&img);
        for y in 0..10 {
            for x in 0..10 {
                assert_relative_eq!(grad.gx.get(x, y), 0.25, epsilon = 1e-5);
                assert_relative_eq!(grad.gy.get(x, y), -0.75, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn laplacian_of_constant_image_is_zero() {
        let img = ImageF32::from_fn(6, 6, |_, _| 3.0);
        let lap = laplacian(&img);
        assert!(lap.data.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn window_variance_zero_on_flat_nonzero_on_edge() {
        let flat = ImageF32::from_fn(9, 9, |_, _| 0.4);
        assert!(window_variance(&flat, 2).data.iter().all(|&v| v < 1e-9));

        let step = ImageF32::from_fn(9, 9, |x, _| if x < 4 { 0.0 } else { 1.0 });
        let var = window_variance(&step, 2);
        assert!(var.get(4, 4) > 0.1);
    }
}
