// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (image + oxipng), and the
// size-constrained export that searches JPEG quality against a byte budget.

use crate::engine::common::run_with_panic_policy;
use crate::engine::decoder::check_dimensions;
use crate::engine::composite::flatten_onto;
use crate::engine::io::write_atomic;
use crate::error::CanvasError;
use crate::ops::{Background, ExportSettings, OutputFormat};
use crate::raster::RasterImage;
use image::{DynamicImage, ImageFormat, RgbaImage};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

// Always CanvasError so encode failures stay CodecError
type EncoderResult<T> = std::result::Result<T, CanvasError>;

/// Tunables for export encoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Binary-search steps over JPEG quality when a budget is set
    pub search_iterations: u32,
    /// Quality used when no searched quality fits the budget
    pub floor_quality: f32,
    /// oxipng preset (0-6)
    pub png_optimization_level: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            search_iterations: 6,
            floor_quality: 0.1,
            png_optimization_level: 4,
        }
    }
}

/// Soft condition attached to an export whose byte budget was not honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetWarning {
    /// Lossless output is never degraded; it came out larger than the budget
    LosslessBudgetIgnored { actual: u64, budget: u64 },
    /// Even the floor quality exceeds the budget
    BudgetUnreachable { actual: u64, budget: u64 },
}

impl std::fmt::Display for BudgetWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetWarning::LosslessBudgetIgnored { actual, budget } => write!(
                f,
                "lossless output is {actual} bytes, over the {budget} byte budget"
            ),
            BudgetWarning::BudgetUnreachable { actual, budget } => write!(
                f,
                "lowest quality output is {actual} bytes, over the {budget} byte budget"
            ),
        }
    }
}

/// Encoded export result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBlob {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// Quality actually used (JPEG only)
    pub quality: Option<f32>,
    pub warning: Option<BudgetWarning>,
}

impl ExportBlob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// `stem` plus the format extension, e.g. `collage.jpg`.
    pub fn suggested_filename(&self, stem: &str) -> String {
        format!("{stem}.{}", self.extension())
    }

    /// Atomically write the encoded bytes to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> EncoderResult<()> {
        write_atomic(path.as_ref(), &self.bytes)
    }
}

/// Map a 0.0-1.0 quality to the encoder's 1-100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode to JPEG with mozjpeg (progressive, optimized scans).
///
/// JPEG has no alpha, so the caller must hand in pixels that are already
/// opaque. [`encode`] takes care of that.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        use std::borrow::Cow;
        let quality = quality.clamp(1, 100);

        let rgb: Cow<'_, image::RgbImage> = match img {
            DynamicImage::ImageRgb8(rgb_img) => Cow::Borrowed(rgb_img),
            _ => Cow::Owned(img.to_rgb8()),
        };
        let (w, h) = rgb.dimensions();
        let pixels: &[u8] = rgb.as_raw();

        if w == 0 || h == 0 {
            return Err(CanvasError::invalid_target_size(f64::from(w), f64::from(h)));
        }
        check_dimensions(w, h)?;

        let mut comp = Compress::new(ColorSpace::JCS_RGB);
        comp.set_size(w as usize, h as usize);
        comp.set_color_space(ColorSpace::JCS_YCbCr);

        comp.set_quality(f32::from(quality));
        comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);
        comp.set_optimize_scans(true);
        comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);

        let estimated_size = (w as usize * h as usize * 3 / 10).max(4096);
        let mut output = Vec::with_capacity(estimated_size);

        {
            let mut writer = comp.start_compress(&mut output).map_err(|e| {
                CanvasError::encode_failed("jpeg", format!("mozjpeg: failed to start compress: {e:?}"))
            })?;

            let stride = w as usize * 3;
            for row in pixels.chunks(stride) {
                writer.write_scanlines(row).map_err(|e| {
                    CanvasError::encode_failed(
                        "jpeg",
                        format!("mozjpeg: failed to write scanlines: {e:?}"),
                    )
                })?;
            }

            writer.finish().map_err(|e| {
                CanvasError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}"))
            })?;
        }

        Ok(output)
    })
}

/// Encode to PNG with the image crate, then recompress losslessly with oxipng.
pub fn encode_png(img: &DynamicImage, optimization_level: u8) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| CanvasError::encode_failed("png", format!("PNG encode failed: {e}")))?;

        let mut options = oxipng::Options::from_preset(optimization_level.min(6));
        options.strip = oxipng::StripChunks::None;

        oxipng::optimize_from_memory(&buf, &options).map_err(|e| {
            CanvasError::encode_failed("png", format!("oxipng optimization failed: {e}"))
        })
    })
}

/// Pixels as the encoder for `format` expects them. JPEG is matted onto white.
fn prepare_pixels(img: &RasterImage, format: OutputFormat) -> DynamicImage {
    match format {
        OutputFormat::Png => img.to_dynamic(),
        OutputFormat::Jpeg => {
            let matte = Background::WHITE;
            let flat: RgbaImage = flatten_onto(img.as_rgba(), matte);
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(flat).to_rgb8())
        }
    }
}

fn encode_prepared(
    pixels: &DynamicImage,
    format: OutputFormat,
    quality: f32,
    config: &EncoderConfig,
) -> EncoderResult<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(pixels, jpeg_quality(quality)),
        OutputFormat::Png => encode_png(pixels, config.png_optimization_level),
    }
}

/// Single encode of `img` at `quality` (ignored for PNG).
pub fn encode(
    img: &RasterImage,
    format: OutputFormat,
    quality: f32,
    config: &EncoderConfig,
) -> EncoderResult<Vec<u8>> {
    encode_prepared(&prepare_pixels(img, format), format, quality, config)
}

/// Outcome of a quality search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub bytes: Vec<u8>,
    pub quality: f32,
    /// Set when nothing fit and the floor encode is over budget
    pub over_budget: bool,
}

/// Binary search over quality in `[0, 1]` for the largest quality whose
/// encoding fits in `budget` bytes.
///
/// Runs exactly `iterations` encodes at the interval midpoint. When none fits,
/// encodes once more at `floor` and returns that, flagged if it is over budget.
pub fn search_quality<F>(
    budget: u64,
    iterations: u32,
    floor: f32,
    mut encode_at: F,
) -> EncoderResult<SearchOutcome>
where
    F: FnMut(f32) -> EncoderResult<Vec<u8>>,
{
    let mut min = 0.0f32;
    let mut max = 1.0f32;
    let mut best: Option<(Vec<u8>, f32)> = None;

    for iteration in 0..iterations {
        let quality = (min + max) / 2.0;
        let bytes = encode_at(quality)?;
        let size = bytes.len() as u64;
        debug!(iteration, quality, size, budget, "quality search step");
        if size <= budget {
            best = Some((bytes, quality));
            min = quality;
        } else {
            max = quality;
        }
    }

    match best {
        Some((bytes, quality)) => Ok(SearchOutcome {
            bytes,
            quality,
            over_budget: false,
        }),
        None => {
            let bytes = encode_at(floor)?;
            let over_budget = bytes.len() as u64 > budget;
            Ok(SearchOutcome {
                bytes,
                quality: floor,
                over_budget,
            })
        }
    }
}

/// JPEG blob from a quality search, flagged when even the floor is over budget.
fn budgeted_jpeg<F>(budget: u64, config: &EncoderConfig, encode_at: F) -> EncoderResult<ExportBlob>
where
    F: FnMut(f32) -> EncoderResult<Vec<u8>>,
{
    let outcome = search_quality(budget, config.search_iterations, config.floor_quality, encode_at)?;
    let actual = outcome.bytes.len() as u64;
    Ok(ExportBlob {
        bytes: outcome.bytes,
        format: OutputFormat::Jpeg,
        quality: Some(outcome.quality),
        warning: outcome
            .over_budget
            .then_some(BudgetWarning::BudgetUnreachable { actual, budget }),
    })
}

/// Encode `img` per `settings`, honoring the byte budget where the format allows.
///
/// An unsatisfiable budget is not an error: the blob carries a `BudgetWarning`.
#[tracing::instrument(skip(img, config), fields(width = img.width(), height = img.height()))]
pub fn export(
    img: &RasterImage,
    settings: &ExportSettings,
    config: &EncoderConfig,
) -> EncoderResult<ExportBlob> {
    settings.validate()?;
    let format = settings.format;
    let pixels = prepare_pixels(img, format);

    let blob = match (format, settings.budget_bytes()) {
        (OutputFormat::Png, budget) => {
            let bytes = encode_prepared(&pixels, format, 1.0, config)?;
            let actual = bytes.len() as u64;
            let warning = budget
                .filter(|&budget| actual > budget)
                .map(|budget| BudgetWarning::LosslessBudgetIgnored { actual, budget });
            ExportBlob {
                bytes,
                format,
                quality: None,
                warning,
            }
        }
        (OutputFormat::Jpeg, None) => ExportBlob {
            bytes: encode_prepared(&pixels, format, settings.quality, config)?,
            format,
            quality: Some(settings.quality),
            warning: None,
        },
        (OutputFormat::Jpeg, Some(budget)) => budgeted_jpeg(budget, config, |quality| {
            encode_prepared(&pixels, format, quality, config)
        })?,
    };

    if let Some(warning) = &blob.warning {
        warn!(%warning, "export budget not honored");
    }
    debug!(
        format = format.as_str(),
        bytes = blob.len(),
        quality = ?blob.quality,
        "exported"
    );
    Ok(blob)
}
