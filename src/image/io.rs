//! I/O helpers for grayscale images and JSON.
//!
//! - `load_grayscale_f32`: read a PNG/JPEG/etc. into an `ImageF32` in `[0, 1]`.
//! - `save_heatmap_png`: write an arbitrary-range `ImageF32` as a grayscale
//!   PNG, rescaled so the full value range spans `[0, 255]`.
//! - `write_json_file`: pretty-print a serializable value to disk.
//!
//! Used by the demo binary and debug artifacts only; the reconstruction
//! core never touches the filesystem.
use super::ImageF32;
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk, convert to grayscale and scale into `[0, 1]`.
pub fn load_grayscale_f32(path: &Path) -> Result<ImageF32, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_luma8();
    let w = img.width() as usize;
    let h = img.height() as usize;
    let data = img.into_raw().iter().map(|&b| b as f32 / 255.0).collect();
    Ok(ImageF32::from_vec(w, h, data))
}

/// Save a float image as a grayscale PNG, rescaling its value range to
/// `[0, 255]`. A constant image saves as black.
pub fn save_heatmap_png(image: &ImageF32, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let (lo, hi) = image.min_max();
    let span = (hi - lo).max(f32::EPSILON);
    let mut out = GrayImage::new(image.w as u32, image.h as u32);
    for y in 0..image.h {
        let row = image.row(y);
        for (x, &px) in row.iter().enumerate() {
            let v = ((px - lo) / span * 255.0).clamp(0.0, 255.0);
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
