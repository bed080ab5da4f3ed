//! Fourier-domain integration of gradient fields (Frankot–Chellappa).
//!
//! Given surface gradients `(p, q)` the least-squares-integrable height
//! field satisfies, in the frequency domain,
//! `Ẑ(u, v) = (−i·u·P − i·v·Q) / (u² + v²)`
//! with the zero-frequency bin treated as a removable singularity: it only
//! encodes the additive integration constant, which is unrecoverable from
//! gradients, so it is pinned to zero and the output is made zero-mean.
//!
//! Transforms run in `f64` internally; the row/column pass structure follows
//! the usual 2D FFT factorization.

use crate::grid::Grad;
use crate::image::ImageF32;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::TAU;

/// Integrate gradient fields `(p, q)` into a zero-mean height field.
///
/// Total for every input shape; empty images produce an empty map.
pub fn integrate_gradients(grad: &Grad) -> ImageF32 {
    let (w, h) = (grad.gx.w, grad.gx.h);
    debug_assert!(grad.gy.w == w && grad.gy.h == h);
    if w == 0 || h == 0 {
        return ImageF32::new(w, h);
    }

    let mut p_hat: Vec<Complex<f64>> = grad
        .gx
        .data
        .iter()
        .map(|&v| Complex::new(v as f64, 0.0))
        .collect();
    let mut q_hat: Vec<Complex<f64>> = grad
        .gy
        .data
        .iter()
        .map(|&v| Complex::new(v as f64, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    fft2d(&mut planner, &mut p_hat, w, h, Direction::Forward);
    fft2d(&mut planner, &mut q_hat, w, h, Direction::Forward);

    let mut z_hat = vec![Complex::new(0.0, 0.0); w * h];
    for y in 0..h {
        let wy = angular_frequency(y, h);
        for x in 0..w {
            let wx = angular_frequency(x, w);
            let denom = wx * wx + wy * wy;
            if denom <= f64::EPSILON {
                continue; // zero-frequency bin: integration constant
            }
            let idx = y * w + x;
            let num = Complex::new(0.0, -wx) * p_hat[idx] + Complex::new(0.0, -wy) * q_hat[idx];
            z_hat[idx] = num / denom;
        }
    }

    fft2d(&mut planner, &mut z_hat, w, h, Direction::Inverse);

    let scale = 1.0 / (w * h) as f64;
    let mut out = ImageF32::from_vec(
        w,
        h,
        z_hat.iter().map(|c| (c.re * scale) as f32).collect(),
    );
    let mean = out.mean();
    for v in &mut out.data {
        *v -= mean;
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Inverse,
}

/// Signed DFT bin index mapped to an angular frequency in radians/sample.
#[inline]
fn angular_frequency(index: usize, len: usize) -> f64 {
    let signed = if index <= len / 2 {
        index as isize
    } else {
        index as isize - len as isize
    };
    TAU * signed as f64 / len as f64
}

/// In-place 2D FFT over a row-major buffer: row pass, then column pass.
fn fft2d(
    planner: &mut FftPlanner<f64>,
    data: &mut [Complex<f64>],
    w: usize,
    h: usize,
    direction: Direction,
) {
    let row_fft = match direction {
        Direction::Forward => planner.plan_fft_forward(w),
        Direction::Inverse => planner.plan_fft_inverse(w),
    };
    for row in data.chunks_exact_mut(w) {
        row_fft.process(row);
    }

    let col_fft = match direction {
        Direction::Forward => planner.plan_fft_forward(h),
        Direction::Inverse => planner.plan_fft_inverse(h),
    };
    let mut column = vec![Complex::new(0.0, 0.0); h];
    for x in 0..w {
        for y in 0..h {
            column[y] = data[y * w + x];
        }
        col_fft.process(&mut column);
        for y in 0..h {
            data[y * w + x] = column[y];
        }
    }
}
