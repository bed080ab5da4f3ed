use surface_recon::ImageF32;

/// Constant-intensity field.
pub fn constant_image(w: usize, h: usize, value: f32) -> ImageF32 {
    ImageF32::from_fn(w, h, |_, _| value)
}

/// Deterministic broadband texture in `[0, 1]`, suitable for unambiguous
/// block matching and focus measurement.
pub fn textured_image(w: usize, h: usize) -> ImageF32 {
    ImageF32::from_fn(w, h, |x, y| {
        let smooth = (x as f32 * 0.61).sin() * (y as f32 * 0.83).cos();
        let grain = ((x * 31 + y * 17) % 97) as f32 / 97.0;
        (0.5 + 0.3 * smooth + 0.2 * grain).clamp(0.0, 1.0)
    })
}

/// Copy of `src` shifted right by `shift` pixels; the vacated left margin
/// repeats the source's left column.
pub fn shifted_right(src: &ImageF32, shift: usize) -> ImageF32 {
    ImageF32::from_fn(src.w, src.h, |x, y| src.get(x.saturating_sub(shift), y))
}

/// Focus stack whose per-pixel sharpness peaks at `peak_index`: every slice
/// is the same texture with its contrast scaled down away from the peak.
pub fn focus_stack(w: usize, h: usize, n: usize, peak_index: usize) -> Vec<ImageF32> {
    let tex = textured_image(w, h);
    (0..n)
        .map(|k| {
            let distance = (k as f32 - peak_index as f32).abs();
            let sharpness = 1.0 / (1.0 + 4.0 * distance * distance);
            ImageF32::from_vec(
                w,
                h,
                tex.data
                    .iter()
                    .map(|&v| 0.5 + (v - 0.5) * sharpness)
                    .collect(),
            )
        })
        .collect()
}
