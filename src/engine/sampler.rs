// src/engine/sampler.rs
//
// Grid-sampled transparency detection.

use crate::raster::RasterImage;

/// Upper bound on samples per axis.
const MAX_SAMPLES_PER_AXIS: u32 = 100;
/// Lower bound on samples per axis.
const MIN_SAMPLES_PER_AXIS: u32 = 10;

/// True when a sampled pixel has alpha below 255.
///
/// Visits a grid of roughly `sample_size` points per axis, where
/// `sample_size = clamp(floor(sqrt(w*h) / 10), 10, 100)`. Transparent regions
/// that fall between grid points are missed; callers accept the false negative.
pub fn has_transparency(image: &RasterImage) -> bool {
    if !image.has_alpha_channel() {
        return false;
    }

    let (width, height) = image.dimensions();
    let area = f64::from(width) * f64::from(height);
    let sample_size = ((area.sqrt() / 10.0).floor() as u32)
        .clamp(MIN_SAMPLES_PER_AXIS, MAX_SAMPLES_PER_AXIS);
    let step_x = (width / sample_size).max(1) as usize;
    let step_y = (height / sample_size).max(1) as usize;

    let pixels = image.as_rgba();
    (0..height).step_by(step_y).any(|y| {
        (0..width)
            .step_by(step_x)
            .any(|x| pixels.get_pixel(x, y).0[3] < u8::MAX)
    })
}
