// src/raster.rs
//
// RasterImage: the immutable decoded bitmap every component works on.

use crate::engine::{check_dimensions, decode_oriented, MappedFile};
use crate::error::{CanvasError, Result};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;

/// Immutable RGBA8 bitmap.
///
/// Cloning is cheap (the pixel buffer is shared). Every transformation in the
/// engine produces a new `RasterImage`; none mutates one in place.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    pixels: Arc<RgbaImage>,
    // false when decoded from a format without an alpha channel
    alpha_channel: bool,
}

impl RasterImage {
    /// Wrap an RGBA buffer. Zero-sized buffers are rejected.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(CanvasError::invalid_target_size(
                f64::from(width),
                f64::from(height),
            ));
        }
        check_dimensions(width, height)?;
        Ok(Self {
            pixels: Arc::new(pixels),
            alpha_channel: true,
        })
    }

    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        let alpha_channel = img.color().has_alpha();
        let raster = match img {
            DynamicImage::ImageRgba8(rgba) => Self::from_rgba(rgba)?,
            other => Self::from_rgba(other.to_rgba8())?,
        };
        Ok(Self {
            alpha_channel,
            ..raster
        })
    }

    /// Single-color image, mostly useful for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        Self::from_rgba(RgbaImage::from_pixel(width, height, Rgba(rgba)))
    }

    /// Decode any supported encoded image, applying EXIF orientation.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (img, _format) = decode_oriented(bytes)?;
        Self::from_dynamic(img)
    }

    /// Decode from a file, memory-mapping it instead of copying into the heap.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = MappedFile::open(path.as_ref())?;
        Self::decode(file.as_bytes())
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Source aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width()) / f64::from(self.height())
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    /// Whether the pixel data may carry alpha at all. Rasters decoded from an
    /// opaque format (JPEG, RGB PNG) report false.
    pub fn has_alpha_channel(&self) -> bool {
        self.alpha_channel
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Owned copy of the pixel buffer, for handing to encoders that want one.
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.pixels.as_ref().clone())
    }

    /// True when both values point at the same pixel buffer.
    pub fn shares_pixels_with(&self, other: &RasterImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}
