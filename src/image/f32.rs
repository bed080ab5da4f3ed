//! Owned single-channel f32 image in row-major layout (stride == width).
//!
//! The working currency of every solver in this crate: input intensities,
//! gradient fields, disparity maps and confidence maps are all `ImageF32`.
#[derive(Clone, Debug, Default)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Backing storage in row-major order, `w * h` elements
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0.0; w * h],
        }
    }

    /// Wrap an existing row-major buffer. Panics if the length is wrong.
    pub fn from_vec(w: usize, h: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), w * h, "buffer length must equal w * h");
        Self { w, h, data }
    }

    /// Construct by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    /// Get the pixel value at (x, y).
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }

    #[inline]
    /// Set the pixel value at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = y * self.w + x;
        self.data[i] = v;
    }

    #[inline]
    /// Borrow row `y` as a slice.
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }

    #[inline]
    /// Borrow row `y` mutably.
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.w;
        let end = start + self.w;
        &mut self.data[start..end]
    }

    /// True when both images have the same lateral dimensions.
    #[inline]
    pub fn same_shape(&self, other: &ImageF32) -> bool {
        self.w == other.w && self.h == other.h
    }

    /// Minimum and maximum pixel values. Returns `(0.0, 0.0)` when empty.
    pub fn min_max(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for &v in &self.data {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if lo > hi {
            (0.0, 0.0)
        } else {
            (lo, hi)
        }
    }

    /// Arithmetic mean of all pixels (0.0 when empty).
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| v as f64).sum();
        (sum / self.data.len() as f64) as f32
    }

    /// Rescale intensities to `[0, 1]`. A constant image maps to all zeros.
    pub fn normalized(&self) -> ImageF32 {
        let (lo, hi) = self.min_max();
        let span = hi - lo;
        if span <= f32::EPSILON {
            return ImageF32::new(self.w, self.h);
        }
        let inv = 1.0 / span;
        let data = self.data.iter().map(|&v| (v - lo) * inv).collect();
        ImageF32 {
            w: self.w,
            h: self.h,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_spans_unit_interval() {
        let img = ImageF32::from_vec(2, 2, vec![10.0, 20.0, 30.0, 40.0]);
        let n = img.normalized();
        assert_eq!(n.min_max(), (0.0, 1.0));
    }

    #[test]
    fn normalized_constant_image_is_zero() {
        let img = ImageF32::from_vec(3, 1, vec![7.0; 3]);
        let n = img.normalized();
        assert!(n.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn from_fn_evaluates_row_major() {
        let img = ImageF32::from_fn(3, 2, |x, y| (y * 10 + x) as f32);
        assert_eq!(img.get(2, 1), 12.0);
        assert_eq!(img.row(1), &[10.0, 11.0, 12.0]);
    }
}
