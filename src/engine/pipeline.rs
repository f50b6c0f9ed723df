// src/engine/pipeline.rs
//
// Raster pipeline: crop renderer, canvas compositor and the shared
// "draw a source scaled into a rect" step they are built from.
//
// Resampling uses fast_image_resize (Lanczos3, alpha premultiplied) and only
// covers the part of the destination rect that is visible on the canvas.

use crate::engine::common::run_with_panic_policy;
use crate::engine::composite::{fill, over_at};
use crate::engine::geometry::fit_rect;
use crate::error::CanvasError;
use crate::ops::{Background, FitMode, ObjectTransform, PixelCrop, Rect};
use crate::raster::RasterImage;
use fast_image_resize::{self as fir, MulDiv, PixelType, ResizeOptions};
use image::{imageops::FilterType, RgbaImage};
use tracing::{debug, warn};

type PipelineResult<T> = std::result::Result<T, CanvasError>;

/// Source region and destination size of a single resample.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ResampleRegion {
    src_x: f64,
    src_y: f64,
    src_width: f64,
    src_height: f64,
    dst_width: u32,
    dst_height: u32,
}

impl ResampleRegion {
    /// True when the region is the whole source at 1:1, so no resampling is needed.
    fn is_identity(&self, src: &RgbaImage) -> bool {
        self.src_x == 0.0
            && self.src_y == 0.0
            && self.src_width == f64::from(src.width())
            && self.src_height == f64::from(src.height())
            && self.dst_width == src.width()
            && self.dst_height == src.height()
    }
}

fn default_resize_options() -> ResizeOptions {
    ResizeOptions::new().resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
}

fn is_fully_opaque(pixels: &RgbaImage) -> bool {
    pixels.as_raw().iter().skip(3).step_by(4).all(|&a| a == 255)
}

/// Resample `region` of `src` to exactly `dst_width`x`dst_height`.
fn resample(src: &RgbaImage, region: ResampleRegion) -> PipelineResult<RgbaImage> {
    if region.is_identity(src) {
        return Ok(src.clone());
    }

    let source_dims = src.dimensions();
    let target_dims = (region.dst_width, region.dst_height);
    let primary = run_with_panic_policy("resize:fir", || {
        resample_with_fir(src, region)
            .map_err(|reason| CanvasError::resize_failed(source_dims, target_dims, reason))
    });

    match primary {
        Ok(img) => Ok(img),
        Err(err @ CanvasError::InternalPanic { .. }) => Err(err),
        Err(err) => {
            warn!(error = %err, "fast_image_resize failed, falling back to image crate");
            resample_with_image_crate(src, region).map_err(|fallback| {
                CanvasError::resize_failed(
                    source_dims,
                    target_dims,
                    format!("{err}; image crate fallback failed: {fallback}"),
                )
            })
        }
    }
}

/// Clamp the crop box to the source so float drift at the edges never asks
/// the resizer for pixels past the buffer.
fn clamp_to_source(region: ResampleRegion, src: &RgbaImage) -> (f64, f64, f64, f64) {
    let (sw, sh) = (f64::from(src.width()), f64::from(src.height()));
    let x = region.src_x.clamp(0.0, sw);
    let y = region.src_y.clamp(0.0, sh);
    let width = region.src_width.min(sw - x).max(0.0);
    let height = region.src_height.min(sh - y).max(0.0);
    (x, y, width, height)
}

fn resample_with_fir(src: &RgbaImage, region: ResampleRegion) -> Result<RgbaImage, String> {
    let (x, y, width, height) = clamp_to_source(region, src);
    if width <= 0.0 || height <= 0.0 {
        return Err("crop region outside source".to_string());
    }
    let options = default_resize_options().crop(x, y, width, height);
    let mut dst_image = fir::images::Image::new(region.dst_width, region.dst_height, PixelType::U8x4);
    let mut resizer = fir::Resizer::new();

    if is_fully_opaque(src) {
        // Premultiplying opaque pixels is the identity; resize straight from the shared buffer
        let src_image = fir::images::ImageRef::new(
            src.width(),
            src.height(),
            src.as_raw().as_slice(),
            PixelType::U8x4,
        )
        .map_err(|e| format!("fir source image error: {e:?}"))?;
        resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| format!("fir resize error: {e:?}"))?;
    } else {
        let mut src_image = fir::images::Image::from_vec_u8(
            src.width(),
            src.height(),
            src.as_raw().clone(),
            PixelType::U8x4,
        )
        .map_err(|e| format!("fir source image error: {e:?}"))?;

        let mul_div = MulDiv::default();
        mul_div
            .multiply_alpha_inplace(&mut src_image)
            .map_err(|e| format!("failed to premultiply alpha: {e}"))?;
        resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| format!("fir resize error: {e:?}"))?;
        mul_div
            .divide_alpha_inplace(&mut dst_image)
            .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;
    }

    RgbaImage::from_raw(region.dst_width, region.dst_height, dst_image.into_vec())
        .ok_or_else(|| "failed to create rgba image from resized data".to_string())
}

fn resample_with_image_crate(src: &RgbaImage, region: ResampleRegion) -> Result<RgbaImage, String> {
    let x = region.src_x.floor().max(0.0) as u32;
    let y = region.src_y.floor().max(0.0) as u32;
    let width = (region.src_width.ceil() as u32).clamp(1, src.width().saturating_sub(x).max(1));
    let height = (region.src_height.ceil() as u32).clamp(1, src.height().saturating_sub(y).max(1));
    if x >= src.width() || y >= src.height() {
        return Err("crop region outside source".to_string());
    }
    let view = image::imageops::crop_imm(src, x, y, width, height).to_image();
    Ok(image::imageops::resize(
        &view,
        region.dst_width,
        region.dst_height,
        FilterType::Lanczos3,
    ))
}

/// Draw `src` scaled into `rect` (canvas coordinates) with source-over.
///
/// Rect edges are rounded independently, then only the part of the rect that
/// intersects the canvas is resampled. An empty or fully off-canvas rect
/// draws nothing.
pub fn draw_scaled(canvas: &mut RgbaImage, src: &RasterImage, rect: &Rect) -> PipelineResult<()> {
    if !rect.is_drawable() {
        return Ok(());
    }

    let left = rect.x.round();
    let top = rect.y.round();
    let right = rect.right().round();
    let bottom = rect.bottom().round();
    let dest_width = right - left;
    let dest_height = bottom - top;
    if dest_width <= 0.0 || dest_height <= 0.0 {
        return Ok(());
    }

    let visible_left = left.max(0.0);
    let visible_top = top.max(0.0);
    let visible_right = right.min(f64::from(canvas.width()));
    let visible_bottom = bottom.min(f64::from(canvas.height()));
    if visible_left >= visible_right || visible_top >= visible_bottom {
        return Ok(());
    }

    let scale_x = f64::from(src.width()) / dest_width;
    let scale_y = f64::from(src.height()) / dest_height;
    let region = ResampleRegion {
        src_x: (visible_left - left) * scale_x,
        src_y: (visible_top - top) * scale_y,
        src_width: (visible_right - visible_left) * scale_x,
        src_height: (visible_bottom - visible_top) * scale_y,
        dst_width: (visible_right - visible_left) as u32,
        dst_height: (visible_bottom - visible_top) as u32,
    };

    let patch = resample(src.as_rgba(), region)?;
    over_at(canvas, &patch, visible_left as i64, visible_top as i64);
    Ok(())
}

fn blank_canvas(width: u32, height: u32, background: &Background) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    if let Some(rgba) = background.fill() {
        fill(&mut canvas, rgba);
    }
    canvas
}

/// Crop renderer: a new raster of exactly `(round(width), round(height))`.
///
/// The canvas is filled with `background` and the source region starting at
/// `(round(x), round(y))` is composited 1:1 onto its origin. Source pixels
/// outside the source bounds leave the fill untouched.
#[tracing::instrument(skip(src), fields(src_w = src.width(), src_h = src.height()))]
pub fn render_crop(
    src: &RasterImage,
    crop: &PixelCrop,
    background: &Background,
) -> PipelineResult<RasterImage> {
    if !crop.is_drawable() || !crop.x.is_finite() || !crop.y.is_finite() {
        return Err(CanvasError::invalid_crop_dimensions(crop.width, crop.height));
    }
    let out_width = crop.width.round();
    let out_height = crop.height.round();
    if out_width < 1.0 || out_height < 1.0 || out_width > f64::from(u32::MAX) || out_height > f64::from(u32::MAX) {
        return Err(CanvasError::invalid_crop_dimensions(crop.width, crop.height));
    }
    let (out_width, out_height) = (out_width as u32, out_height as u32);
    crate::engine::check_dimensions(out_width, out_height)?;

    let mut canvas = blank_canvas(out_width, out_height, background);
    let (origin_x, origin_y) = (crop.x.round(), crop.y.round());
    // Overlap is decided in f64 so a far-off origin never reaches the integer cast
    let overlaps = origin_x < f64::from(src.width())
        && origin_y < f64::from(src.height())
        && origin_x > -f64::from(out_width)
        && origin_y > -f64::from(out_height);
    if overlaps {
        // Shifting the source by -origin puts the crop region at (0, 0); over_at clips the rest
        over_at(&mut canvas, src.as_rgba(), -(origin_x as i64), -(origin_y as i64));
    }

    debug!(out_width, out_height, "rendered crop");
    RasterImage::from_rgba(canvas)
}

/// Canvas compositor: fill a `target_width`x`target_height` raster with
/// `background`, then draw `src` into the rect computed by the fit geometry.
#[tracing::instrument(skip(src, transform), fields(src_w = src.width(), src_h = src.height()))]
pub fn compose(
    src: &RasterImage,
    target_width: u32,
    target_height: u32,
    fit: FitMode,
    background: &Background,
    transform: &ObjectTransform,
) -> PipelineResult<RasterImage> {
    if target_width == 0 || target_height == 0 {
        return Err(CanvasError::invalid_target_size(
            f64::from(target_width),
            f64::from(target_height),
        ));
    }
    crate::engine::check_dimensions(target_width, target_height)?;

    let rect = fit_rect(
        src.width(),
        src.height(),
        f64::from(target_width),
        f64::from(target_height),
        fit,
        transform,
    )?;

    let mut canvas = blank_canvas(target_width, target_height, background);
    draw_scaled(&mut canvas, src, &rect)?;

    debug!(
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "composed canvas"
    );
    RasterImage::from_rgba(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RasterImage {
        RasterImage::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 5) as u8, (y * 5) as u8, 100, 255])
        }))
        .unwrap()
    }

    #[test]
    fn test_crop_full_source_is_identity() {
        let src = gradient(40, 30);
        let out = render_crop(
            &src,
            &Rect::new(0.0, 0.0, 40.0, 30.0),
            &Background::Transparent,
        )
        .unwrap();
        assert_eq!(out.as_rgba(), src.as_rgba());
    }

    #[test]
    fn test_crop_past_source_bounds_keeps_fill() {
        let src = gradient(50, 50);
        let out = render_crop(
            &src,
            &Rect::new(10.0, 10.0, 100.0, 100.0),
            &Background::Transparent,
        )
        .unwrap();
        assert_eq!(out.dimensions(), (100, 100));
        for (x, y, px) in out.as_rgba().enumerate_pixels() {
            if x < 40 && y < 40 {
                assert_eq!(px.0, src.pixel(x + 10, y + 10));
            } else {
                assert_eq!(px.0, [0, 0, 0, 0], "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn test_crop_with_solid_background() {
        let src = RasterImage::filled(10, 10, [0, 0, 0, 0]).unwrap();
        let out = render_crop(&src, &Rect::new(0.0, 0.0, 5.0, 5.0), &Background::white()).unwrap();
        assert!(out.as_rgba().pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_crop_negative_origin() {
        let src = gradient(20, 20);
        let out = render_crop(&src, &Rect::new(-5.0, 0.0, 10.0, 10.0), &Background::Transparent)
            .unwrap();
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 0]);
        assert_eq!(out.pixel(5, 0), src.pixel(0, 0));
    }

    #[test]
    fn test_crop_far_off_origin_keeps_fill() {
        let src = gradient(10, 10);
        for crop in [
            Rect::new(-1e19, 0.0, 4.0, 4.0),
            Rect::new(0.0, -1e19, 4.0, 4.0),
            Rect::new(1e19, 1e19, 4.0, 4.0),
            Rect::new(-4.0, 0.0, 4.0, 4.0),
        ] {
            let out = render_crop(&src, &crop, &Background::rgb(0, 0, 255)).unwrap();
            assert_eq!(out.dimensions(), (4, 4));
            assert!(out.as_rgba().pixels().all(|p| p.0 == [0, 0, 255, 255]), "{crop:?}");
        }
    }

    #[test]
    fn test_crop_origin_one_pixel_inside_edge() {
        let src = gradient(10, 10);
        let out = render_crop(&src, &Rect::new(-3.0, 9.0, 4.0, 4.0), &Background::Transparent)
            .unwrap();
        assert_eq!(out.pixel(3, 0), src.pixel(0, 9));
        assert_eq!(out.pixel(2, 0)[3], 0);
        assert_eq!(out.pixel(3, 1)[3], 0);
    }

    #[test]
    fn test_fir_crop_box_is_clamped_to_source() {
        let src = RgbaImage::from_pixel(10, 10, Rgba([40, 80, 120, 255]));
        let region = ResampleRegion {
            src_x: 2.0,
            src_y: -0.000_001,
            src_width: 8.000_001,
            src_height: 10.5,
            dst_width: 5,
            dst_height: 7,
        };
        assert_eq!(clamp_to_source(region, &src), (2.0, 0.0, 8.0, 10.0));
        let out = resample_with_fir(&src, region).unwrap();
        assert_eq!(out.dimensions(), (5, 7));
        assert!(out.pixels().all(|p| p.0 == [40, 80, 120, 255]));
    }

    #[test]
    fn test_fir_rejects_region_past_source() {
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let region = ResampleRegion {
            src_x: 4.0,
            src_y: 0.0,
            src_width: 2.0,
            src_height: 2.0,
            dst_width: 2,
            dst_height: 2,
        };
        assert!(resample_with_fir(&src, region).is_err());
    }

    #[test]
    fn test_crop_degenerate_dimensions() {
        let src = gradient(10, 10);
        for crop in [
            Rect::new(0.0, 0.0, 0.0, 10.0),
            Rect::new(0.0, 0.0, 10.0, -1.0),
            Rect::new(0.0, 0.0, 0.4, 10.0),
        ] {
            let err = render_crop(&src, &crop, &Background::Transparent).unwrap_err();
            assert!(matches!(err, CanvasError::InvalidCropDimensions { .. }));
        }
    }

    #[test]
    fn test_compose_contain_letterbox() {
        let src = RasterImage::filled(1000, 1000, [200, 0, 0, 255]).unwrap();
        let out = compose(
            &src,
            800,
            400,
            FitMode::Contain,
            &Background::Transparent,
            &ObjectTransform::default(),
        )
        .unwrap();
        assert_eq!(out.dimensions(), (800, 400));
        assert_eq!(out.pixel(199, 200)[3], 0);
        assert_eq!(out.pixel(200, 200), [200, 0, 0, 255]);
        assert_eq!(out.pixel(599, 399), [200, 0, 0, 255]);
        assert_eq!(out.pixel(600, 0)[3], 0);
    }

    #[test]
    fn test_compose_stretch_covers_canvas() {
        let src = RasterImage::filled(10, 40, [0, 90, 0, 255]).unwrap();
        let out = compose(
            &src,
            64,
            32,
            FitMode::Stretch,
            &Background::Transparent,
            &ObjectTransform::default(),
        )
        .unwrap();
        assert!(out.as_rgba().pixels().all(|p| p.0 == [0, 90, 0, 255]));
    }

    #[test]
    fn test_compose_offscreen_object_leaves_background() {
        let src = RasterImage::filled(10, 10, [0, 0, 0, 255]).unwrap();
        let out = compose(
            &src,
            20,
            20,
            FitMode::Contain,
            &Background::rgb(1, 2, 3),
            &ObjectTransform::at(500.0, 500.0, 1.0),
        )
        .unwrap();
        assert!(out.as_rgba().pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn test_compose_partially_visible_object() {
        let src = RasterImage::filled(10, 10, [9, 9, 9, 255]).unwrap();
        let out = compose(
            &src,
            20,
            20,
            FitMode::Contain,
            &Background::Transparent,
            &ObjectTransform::at(-10.0, -10.0, 1.0),
        )
        .unwrap();
        // 20x20 draw rect shifted by -10: covers [0,10) on each axis
        assert_eq!(out.pixel(9, 9), [9, 9, 9, 255]);
        assert_eq!(out.pixel(10, 10)[3], 0);
    }

    #[test]
    fn test_compose_rejects_zero_target() {
        let src = gradient(4, 4);
        let err = compose(
            &src,
            0,
            10,
            FitMode::Cover,
            &Background::Transparent,
            &ObjectTransform::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CanvasError::InvalidTargetSize { .. }));
    }

    #[test]
    fn test_resample_keeps_transparent_edges_clean() {
        let mut buf = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0]));
        for y in 2..6 {
            for x in 2..6 {
                buf.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let src = RasterImage::from_rgba(buf).unwrap();
        let mut canvas = RgbaImage::new(16, 16);
        draw_scaled(&mut canvas, &src, &Rect::new(0.0, 0.0, 16.0, 16.0)).unwrap();
        // premultiplied resampling never bleeds black into red
        for px in canvas.pixels().filter(|p| p.0[3] > 200) {
            assert!(px.0[0] > 200, "{:?}", px.0);
        }
    }
}
