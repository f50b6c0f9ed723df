// src/engine/collage.rs
//
// Multi-cell collage renderer.
// Each bound cell is rasterized into its own clipped intermediate (in parallel),
// then the intermediates are composited onto the canvas in layout order.

use crate::engine::composite::{fill, over_at};
use crate::engine::geometry::{fit_rect, require_finite};
use crate::engine::pipeline::draw_scaled;
use crate::engine::sampler::has_transparency;
use crate::error::CanvasError;
use crate::layout::Layout;
use crate::ops::{Background, FitMode, ObjectTransform, OutputFormat, Point, Rect};
use crate::raster::RasterImage;
use image::RgbaImage;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

type CollageResult<T> = std::result::Result<T, CanvasError>;

/// Zoom limits for images inside collage cells.
pub const CELL_SCALE_RANGE: (f64, f64) = (0.5, 3.0);

/// An image bound to one collage cell, with its pan/zoom state.
#[derive(Clone, Debug, PartialEq)]
pub struct CellImage {
    pub cell_id: String,
    pub image: RasterImage,
    pub scale: f64,
    /// Pixel offset from the cell's center
    pub position_x: f64,
    pub position_y: f64,
    pub has_transparency: bool,
}

impl CellImage {
    /// Bind `image` to `cell_id` with pan/zoom reset. Samples transparency once.
    pub fn new(cell_id: impl Into<String>, image: RasterImage) -> Self {
        let has_transparency = has_transparency(&image);
        Self {
            cell_id: cell_id.into(),
            image,
            scale: 1.0,
            position_x: 0.0,
            position_y: 0.0,
            has_transparency,
        }
    }
}

/// Cell id -> binding. At most one image per cell.
pub type CellBindings = HashMap<String, CellImage>;

/// Canvas background for a collage export.
///
/// Transparent only for PNG when there is at least one bound image and every
/// bound image was sampled as having transparency. Otherwise opaque white.
pub fn collage_background(bindings: &CellBindings, format: OutputFormat) -> Background {
    let all_transparent =
        !bindings.is_empty() && bindings.values().all(|binding| binding.has_transparency);
    if format == OutputFormat::Png && all_transparent {
        Background::Transparent
    } else {
        Background::white()
    }
}

/// Rasterize one bound cell into a transparent `width`x`height` intermediate.
/// Nothing outside `(0, 0, width, height)` survives.
fn rasterize_cell(binding: &CellImage, width: u32, height: u32) -> CollageResult<RgbaImage> {
    require_finite("position", binding.position_x, binding.position_y)?;
    let centered = fit_rect(
        binding.image.width(),
        binding.image.height(),
        f64::from(width),
        f64::from(height),
        FitMode::Contain,
        &ObjectTransform::centered(binding.scale),
    )?;
    let rect = Rect {
        x: centered.x + binding.position_x,
        y: centered.y + binding.position_y,
        ..centered
    };

    let mut cell = RgbaImage::new(width, height);
    draw_scaled(&mut cell, &binding.image, &rect)?;
    Ok(cell)
}

/// Pixel placement of a cell on the canvas: rounded origin and size.
fn cell_placement(layout: &Layout, cell_index: usize) -> CollageResult<(Point, u32, u32)> {
    let cell = &layout.cells()[cell_index];
    let bounds = layout.cell_bounds(cell)?;
    let width = bounds.width.round();
    let height = bounds.height.round();
    if width < 1.0 || height < 1.0 {
        return Err(CanvasError::invalid_cell_bounds(
            cell.id.clone(),
            bounds.width,
            bounds.height,
        ));
    }
    Ok((
        Point::new(bounds.x.round(), bounds.y.round()),
        width as u32,
        height as u32,
    ))
}

/// Render the whole collage.
///
/// Every cell's bounds are validated first, so a layout whose gap swallows a
/// cell fails with `InvalidCellBounds` even if that cell is unbound.
#[tracing::instrument(skip(layout, bindings), fields(layout = layout.id(), bound = bindings.len()))]
pub fn render_collage(
    layout: &Layout,
    bindings: &CellBindings,
    format: OutputFormat,
) -> CollageResult<RasterImage> {
    for cell_id in bindings.keys() {
        layout.require_cell(cell_id)?;
    }

    let placements = (0..layout.cells().len())
        .map(|index| cell_placement(layout, index))
        .collect::<CollageResult<Vec<_>>>()?;

    let jobs: Vec<_> = layout
        .cells()
        .iter()
        .zip(placements)
        .filter_map(|(cell, placement)| bindings.get(&cell.id).map(|b| (b, placement)))
        .collect();

    let rasters = jobs
        .par_iter()
        .map(|(binding, (origin, width, height))| {
            rasterize_cell(binding, *width, *height).map(|raster| (*origin, raster))
        })
        .collect::<CollageResult<Vec<_>>>()?;

    let (canvas_width, canvas_height) = layout.canvas_size();
    let background = collage_background(bindings, format);
    let mut canvas = RgbaImage::new(canvas_width, canvas_height);
    if let Some(rgba) = background.fill() {
        fill(&mut canvas, rgba);
    }

    // Layout order, so overlapping cells paint deterministically
    for (origin, raster) in &rasters {
        over_at(&mut canvas, raster, origin.x as i64, origin.y as i64);
    }

    debug!(
        cells = layout.cells().len(),
        painted = rasters.len(),
        transparent = background == Background::Transparent,
        "rendered collage"
    );
    RasterImage::from_rgba(canvas)
}
