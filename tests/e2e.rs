mod common;

use common::synthetic::{constant_image, focus_stack, shifted_right, textured_image};
use surface_recon::mesh::{build_mesh, MeshParams};
use surface_recon::shading::ShadingParams;
use surface_recon::stereo::StereoParams;
use surface_recon::types::ParamRecord;
use surface_recon::{Method, ReconParams, ReconstructionRequest, Reconstructor};

fn assert_confidence_bounded(result: &surface_recon::ReconstructionResult) {
    for y in 0..result.summary.height {
        for x in 0..result.summary.width {
            let c = result.confidence.get(x, y);
            assert!((0.0..=1.0).contains(&c), "confidence {c} at ({x},{y})");
        }
    }
}

#[test]
fn constant_image_shading_gives_flat_surface() {
    let params = ReconParams {
        shading: ShadingParams {
            albedo: 0.5,
            ..ShadingParams::default()
        },
        ..ReconParams::default()
    };
    let recon = Reconstructor::new(params);
    let result = recon
        .process(ReconstructionRequest::shading(constant_image(32, 32, 0.5)))
        .expect("valid input");

    assert_eq!(result.method, Method::Shading);
    let (lo, hi) = result.depth.min_max();
    assert!(hi - lo < 1e-3, "depth spread {}", hi - lo);
    for n in &result.normals.data {
        assert!((n.z - 1.0).abs() < 1e-3, "normal {n:?}");
    }
    assert!(
        result.summary.confidence_mean > 0.99,
        "confidence {}",
        result.summary.confidence_mean
    );
    match result.record {
        ParamRecord::Shading(ref rec) => assert!(rec.converged),
        _ => panic!("wrong record variant"),
    }
    assert_confidence_bounded(&result);
}

#[test]
fn stereo_pair_recovers_integer_shift() {
    let shift = 5usize;
    let reference = textured_image(50, 50);
    let tilted = shifted_right(&reference, shift);

    let stereo = StereoParams {
        tilt_angle_deg: 5.0,
        pixel_size: 1.0,
        block_size: 11,
        max_disparity: 10,
    };
    let depth_per_disparity = 1.0 / (2.0 * (5.0f32.to_radians() / 2.0).sin());
    let recon = Reconstructor::new(ReconParams {
        stereo,
        ..ReconParams::default()
    });
    let result = recon
        .process(ReconstructionRequest::stereo(reference, tilted))
        .expect("valid input");

    assert_eq!(result.method, Method::Stereo);
    let half = 11 / 2;
    let expected = shift as f32 * depth_per_disparity;
    for y in half..50 - half {
        for x in (half + shift)..(50 - half - shift) {
            let d = result.depth.get(x, y) / depth_per_disparity;
            assert!(
                (d - shift as f32).abs() < 1e-3,
                "pixel ({x},{y}) disparity {d}, expected {shift}"
            );
            assert!((result.depth.get(x, y) - expected).abs() < 5e-2);
        }
    }
    assert_confidence_bounded(&result);
}

#[test]
fn focus_stack_peaks_at_known_position() {
    let positions = vec![0.0, 10.0, 20.0, 30.0, 40.0];
    let stack = focus_stack(40, 40, 5, 3);
    let recon = Reconstructor::new(ReconParams::default());
    let result = recon
        .process(ReconstructionRequest::focus_stack(stack, positions))
        .expect("valid input");

    assert_eq!(result.method, Method::FocusStack);
    for y in 0..40 {
        for x in 0..40 {
            let z = result.depth.get(x, y);
            assert!((z - 30.0).abs() <= 10.0, "pixel ({x},{y}) depth {z}");
            assert!(
                result.confidence.get(x, y) > 0.5,
                "confidence {} at ({x},{y})",
                result.confidence.get(x, y)
            );
        }
    }
    assert_confidence_bounded(&result);
}

#[test]
fn reconstruction_depth_maps_mesh_cleanly() {
    let positions = vec![0.0, 5.0, 10.0];
    let stack = focus_stack(20, 16, 3, 1);
    let recon = Reconstructor::new(ReconParams::default());
    let result = recon
        .process(ReconstructionRequest::focus_stack(stack, positions))
        .expect("valid input");

    let mesh = build_mesh(&result.depth, &MeshParams::default());
    assert_eq!(mesh.vertices.len(), 20 * 16);
    assert_eq!(mesh.faces.len(), 2 * 19 * 15);
    let n = mesh.vertices.len() as u32;
    assert!(mesh.faces.iter().all(|f| f.iter().all(|&i| i < n)));

    let simplified = build_mesh(
        &result.depth,
        &MeshParams {
            simplify: true,
            target_faces: 100,
        },
    );
    assert!(simplified.faces.len() < mesh.faces.len());
    let ns = simplified.vertices.len() as u32;
    assert!(simplified.faces.iter().all(|f| f.iter().all(|&i| i < ns)));
}
