use std::env;
use std::path::Path;

use surface_recon::config::{load_config, ModeConfig, RuntimeConfig};
use surface_recon::image::io::{load_grayscale_f32, save_heatmap_png, write_json_file};
use surface_recon::mesh::{build_mesh, write_stl_ascii};
use surface_recon::{ReconstructionRequest, ReconstructionResult, Reconstructor};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let config_path = args
        .next()
        .ok_or_else(|| "usage: recon_demo <config.json>".to_string())?;
    let config = load_config(Path::new(&config_path))?;

    let request = build_request(&config.mode)?;
    let recon = Reconstructor::new(config.params.clone());
    let result = recon
        .process(request)
        .map_err(|e| format!("Reconstruction failed: {e}"))?;

    print_text_summary(&result);
    write_outputs(&config, &result)?;
    Ok(())
}

fn build_request(mode: &ModeConfig) -> Result<ReconstructionRequest, String> {
    match mode {
        ModeConfig::Shading { image } => {
            Ok(ReconstructionRequest::shading(load_grayscale_f32(image)?))
        }
        ModeConfig::Stereo { reference, tilted } => Ok(ReconstructionRequest::stereo(
            load_grayscale_f32(reference)?,
            load_grayscale_f32(tilted)?,
        )),
        ModeConfig::FocusStack { images, positions } => {
            let mut loaded = Vec::with_capacity(images.len());
            for path in images {
                loaded.push(load_grayscale_f32(path)?);
            }
            Ok(ReconstructionRequest::focus_stack(
                loaded,
                positions.clone(),
            ))
        }
    }
}

fn print_text_summary(result: &ReconstructionResult) {
    println!("method: {:?}", result.method);
    println!(
        "size: {}x{}",
        result.summary.width, result.summary.height
    );
    println!(
        "depth: min={:.4} max={:.4} mean={:.4}",
        result.summary.depth_min, result.summary.depth_max, result.summary.depth_mean
    );
    println!("confidence mean: {:.3}", result.summary.confidence_mean);
    println!("elapsed: {:.2} ms", result.elapsed_ms);
}

fn write_outputs(config: &RuntimeConfig, result: &ReconstructionResult) -> Result<(), String> {
    if let Some(path) = &config.output.json_out {
        write_json_file(path, result)?;
        println!("JSON report written to {}", path.display());
    }
    if let Some(path) = &config.output.depth_png {
        save_heatmap_png(&result.depth.data, path)?;
        println!("Depth heatmap written to {}", path.display());
    }
    if let Some(path) = &config.output.confidence_png {
        save_heatmap_png(result.confidence.as_image(), path)?;
        println!("Confidence heatmap written to {}", path.display());
    }
    if let Some(path) = &config.output.stl_out {
        let mesh = build_mesh(&result.depth, &config.mesh);
        write_stl_ascii(&mesh, "surface", path)?;
        println!(
            "STL mesh written to {} ({} faces)",
            path.display(),
            mesh.faces.len()
        );
    }
    Ok(())
}
