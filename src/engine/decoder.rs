// src/engine/decoder.rs
//
// Decoder operations: JPEG (mozjpeg), PNG (zune-png), everything else via the image crate.
// Also owns the dimension limits and EXIF auto-orientation.

use crate::engine::common::run_with_panic_policy;
use crate::error::CanvasError;
use image::{
    DynamicImage, GrayAlphaImage, GrayImage, ImageFormat, ImageReader, RgbImage, RgbaImage,
};
use mozjpeg::Decompress;
use std::io::Cursor;
use zune_core::bytestream::ZCursor;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_png::PngDecoder;

use crate::engine::{MAX_DIMENSION, MAX_PIXELS};

// Always CanvasError so decode failures keep their category (CodecError, ResourceLimit)
type DecoderResult<T> = std::result::Result<T, CanvasError>;

/// Dimensions and detected format, read from the header only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

/// Decode JPEG using mozjpeg (backed by libjpeg-turbo)
pub fn decode_jpeg_mozjpeg(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:mozjpeg", || {
        if !data.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
            return Err(CanvasError::decode_failed("mozjpeg: missing JPEG EOI marker"));
        }

        let decompress = Decompress::new_mem(data).map_err(|e| {
            CanvasError::decode_failed(format!("mozjpeg decompress init failed: {e:?}"))
        })?;

        let mut decompress = decompress.rgb().map_err(|e| {
            CanvasError::decode_failed(format!("mozjpeg rgb conversion failed: {e:?}"))
        })?;

        let (width_u32, height_u32) = usize_dimensions(decompress.width(), decompress.height());
        check_dimensions(width_u32, height_u32)?;

        let pixels: Vec<[u8; 3]> = decompress.read_scanlines().map_err(|e| {
            CanvasError::decode_failed(format!("mozjpeg: failed to read scanlines: {e:?}"))
        })?;
        let flat_pixels: Vec<u8> = pixels.into_iter().flatten().collect();

        let rgb_image = RgbImage::from_raw(width_u32, height_u32, flat_pixels).ok_or_else(|| {
            CanvasError::decode_failed("mozjpeg: failed to create image from raw data")
        })?;

        Ok(DynamicImage::ImageRgb8(rgb_image))
    })
}

/// Decode PNG using zune-png. 16-bit input is stripped to 8-bit.
pub fn decode_png_zune(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:png", || {
        // Size limits are ours to report (ResourceLimit), so zune's own caps are lifted
        let options = DecoderOptions::default()
            .png_set_strip_to_8bit(true)
            .set_max_width(usize::MAX)
            .set_max_height(usize::MAX);
        let mut decoder = PngDecoder::new_with_options(ZCursor::new(data), options);
        decoder
            .decode_headers()
            .map_err(|e| CanvasError::decode_failed(format!("png: bad header: {e}")))?;
        let (width, height) = decoder
            .dimensions()
            .ok_or_else(|| CanvasError::decode_failed("png: missing header info"))?;
        let (width, height) = usize_dimensions(width, height);
        // Pixel budget is enforced before any pixel data is inflated
        check_dimensions(width, height)?;

        let pixels = decoder
            .decode()
            .map_err(|e| CanvasError::decode_failed(format!("png: decode failed: {e}")))?;

        let buf = match pixels {
            zune_core::result::DecodingResult::U8(v) => v,
            _ => {
                return Err(CanvasError::decode_failed(
                    "png: unexpected non-U8 pixel buffer",
                ))
            }
        };

        let colorspace = decoder
            .colorspace()
            .ok_or_else(|| CanvasError::decode_failed("png: missing colorspace"))?;

        let img = match colorspace {
            ColorSpace::RGB => RgbImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| CanvasError::decode_failed("png: failed to build RGB image"))?,
            ColorSpace::RGBA => RgbaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(|| CanvasError::decode_failed("png: failed to build RGBA image"))?,
            ColorSpace::Luma => GrayImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| CanvasError::decode_failed("png: failed to build Luma image"))?,
            ColorSpace::LumaA => GrayAlphaImage::from_raw(width, height, buf)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(|| CanvasError::decode_failed("png: failed to build LumaA image"))?,
            other => {
                return Err(CanvasError::decode_failed(format!(
                    "png: unsupported colorspace {other:?}"
                )))
            }
        };

        Ok(img)
    })
}

/// Decode any other format (WebP, GIF first frame, ...) via the image crate.
pub fn decode_with_image_crate(data: &[u8]) -> DecoderResult<DynamicImage> {
    run_with_panic_policy("decode:image", || {
        ensure_dimensions_safe(data)?;
        image::load_from_memory(data).map_err(|e| match e {
            image::ImageError::Unsupported(u) => CanvasError::unsupported_format(u.to_string()),
            other => CanvasError::decode_failed(format!("decode failed: {other}")),
        })
    })
}

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Unified decode entrypoint:
/// - Detect format once (magic bytes)
/// - Route JPEG to mozjpeg, PNG to zune-png, the rest to the image crate
/// - Return decoded image and detected format
///
/// Does not apply EXIF orientation. See [`decode_oriented`].
pub fn decode_image(bytes: &[u8]) -> DecoderResult<(DynamicImage, Option<ImageFormat>)> {
    let detected = detect_format(bytes);
    let img = match detected {
        Some(ImageFormat::Jpeg) => decode_jpeg_mozjpeg(bytes)?,
        Some(ImageFormat::Png) => decode_png_zune(bytes)?,
        None => {
            return Err(CanvasError::unsupported_format(
                "unrecognized image signature",
            ))
        }
        _ => decode_with_image_crate(bytes)?,
    };
    tracing::debug!(
        format = ?detected,
        width = img.width(),
        height = img.height(),
        "decoded image"
    );
    Ok((img, detected))
}

/// Decode and rotate/flip according to the EXIF Orientation tag, the way a
/// browser displays the file.
pub fn decode_oriented(bytes: &[u8]) -> DecoderResult<(DynamicImage, Option<ImageFormat>)> {
    let (img, format) = decode_image(bytes)?;
    let img = match detect_exif_orientation(bytes) {
        Some(orientation) => apply_exif_orientation(img, orientation),
        None => img,
    };
    Ok((img, format))
}

/// Decoder-reported dimensions as u32, saturating so the limit check still fires.
fn usize_dimensions(width: usize, height: usize) -> (u32, u32) {
    let clamp = |v: usize| u32::try_from(v).unwrap_or(u32::MAX);
    (clamp(width), clamp(height))
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(CanvasError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(CanvasError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> DecoderResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}

/// Read dimensions and format from the header without decoding pixel data.
pub fn inspect_header(bytes: &[u8]) -> DecoderResult<ImageHeader> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CanvasError::decode_failed(format!("failed to read header: {e}")))?;
    let format = reader.format();
    if format.is_none() {
        return Err(CanvasError::unsupported_format(
            "unrecognized image signature",
        ));
    }
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| CanvasError::decode_failed(format!("failed to read dimensions: {e}")))?;
    Ok(ImageHeader {
        width,
        height,
        format,
    })
}

/// Extract EXIF Orientation tag (1-8). Returns None if missing or invalid.
pub fn detect_exif_orientation(bytes: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(bytes);
    let exif_reader = exif::Reader::new();
    let exif = exif_reader.read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    // Short or Long depending on the writer
    let value = field.value.get_uint(0)?;
    let orientation = value as u16;
    if (1..=8).contains(&orientation) {
        Some(orientation)
    } else {
        None
    }
}

/// Rotate/flip so the pixels read upright. 1 (and anything unknown) is identity.
pub fn apply_exif_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
