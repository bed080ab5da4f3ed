use std::f32::consts::TAU;
use surface_recon::grid::Grad;
use surface_recon::integrate::integrate_gradients;
use surface_recon::ImageF32;

/// A periodic height field and its analytic gradients.
fn analytic_surface(w: usize, h: usize) -> (ImageF32, Grad) {
    let z = ImageF32::from_fn(w, h, |x, y| {
        (TAU * x as f32 / w as f32).cos() + 0.7 * (TAU * 2.0 * y as f32 / h as f32).sin()
    });
    let gx = ImageF32::from_fn(w, h, |x, _| {
        -(TAU / w as f32) * (TAU * x as f32 / w as f32).sin()
    });
    let gy = ImageF32::from_fn(w, h, |_, y| {
        0.7 * (TAU * 2.0 / h as f32) * (TAU * 2.0 * y as f32 / h as f32).cos()
    });
    (z, Grad { gx, gy })
}

#[test]
fn gradient_integration_round_trips_up_to_a_constant() {
    let (z_true, grad) = analytic_surface(48, 36);
    let z_rec = integrate_gradients(&grad);

    let mean_true = z_true.mean();
    let mut max_err = 0.0f32;
    let mut max_abs = 0.0f32;
    for (rec, truth) in z_rec.data.iter().zip(z_true.data.iter()) {
        let centered = truth - mean_true;
        max_err = max_err.max((rec - centered).abs());
        max_abs = max_abs.max(centered.abs());
    }
    assert!(
        max_err / max_abs < 1e-3,
        "relative error {}",
        max_err / max_abs
    );
}

#[test]
fn integrated_depth_is_zero_mean() {
    let (_, grad) = analytic_surface(32, 32);
    let z_rec = integrate_gradients(&grad);
    assert!(z_rec.mean().abs() < 1e-5);
}

#[test]
fn rectangular_grids_are_supported() {
    let (z_true, grad) = analytic_surface(64, 20);
    let z_rec = integrate_gradients(&grad);
    assert_eq!(z_rec.w, 64);
    assert_eq!(z_rec.h, 20);
    // Same shape as the truth, same spatial structure.
    let mean_true = z_true.mean();
    for (rec, truth) in z_rec.data.iter().zip(z_true.data.iter()) {
        assert!((rec - (truth - mean_true)).abs() < 1e-2);
    }
}
