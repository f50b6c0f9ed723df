// src/engine/api.rs
//
// Editing sessions: ImageEditor (single image) and CollageEditor (multi-cell).
// This is the main public API. Every state change goes through &mut self.

use crate::engine::collage::{render_collage, CellBindings, CellImage, CELL_SCALE_RANGE};
use crate::engine::encoder::{export, EncoderConfig, ExportBlob};
use crate::engine::geometry::{lock_aspect, require_finite, resolve_position, Axis};
use crate::engine::history::History;
use crate::engine::pipeline::{compose, render_crop};
use crate::engine::remote::{external_failure, BackgroundRemover};
use crate::error::{CanvasError, Result};
use crate::layout::{Layout, LayoutTemplate, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use crate::ops::{Background, ExportSettings, FitMode, ObjectTransform, PixelCrop, Point, SizePreset};
use crate::raster::RasterImage;
use std::path::Path;
use tracing::debug;

/// Suggested download stem for single-image exports.
pub const EDITED_IMAGE_STEM: &str = "edited-image";
/// Suggested download stem for collage exports.
pub const COLLAGE_STEM: &str = "collage";

// =============================================================================
// SINGLE-IMAGE EDITOR
// =============================================================================

/// Single-image editing session.
///
/// Usage:
/// ```no_run
/// use snapframe::{ImageEditor, ExportSettings, Rect};
///
/// let mut editor = ImageEditor::new();
/// editor.open("photo.jpg")?;
/// editor.crop_original(&Rect::new(0.0, 0.0, 800.0, 600.0))?;
/// editor.set_canvas_size(1080, 1080)?;
/// editor.apply_canvas()?;
/// let blob = editor.export(&ExportSettings::jpeg(0.85).with_max_size_kb(300))?;
/// blob.write_to(blob.suggested_filename("edited-image"))?;
/// # Ok::<(), snapframe::CanvasError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ImageEditor {
    history: Option<History>,
    canvas_width: u32,
    canvas_height: u32,
    maintain_aspect: bool,
    fit: FitMode,
    background: Background,
    transform: ObjectTransform,
    encoder: EncoderConfig,
}

impl Default for ImageEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageEditor {
    pub fn new() -> Self {
        Self {
            history: None,
            canvas_width: 0,
            canvas_height: 0,
            maintain_aspect: true,
            fit: FitMode::Contain,
            background: Background::white(),
            transform: ObjectTransform::default(),
            encoder: EncoderConfig::default(),
        }
    }

    pub fn with_encoder_config(mut self, config: EncoderConfig) -> Self {
        self.encoder = config;
        self
    }

    pub fn encoder_config(&self) -> &EncoderConfig {
        &self.encoder
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Decode `bytes` and start a fresh session (history, canvas and transform reset).
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        let image = RasterImage::decode(bytes)?;
        self.load_image(image);
        Ok(())
    }

    /// Decode a file (memory-mapped) and start a fresh session.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let image = RasterImage::open(path)?;
        self.load_image(image);
        Ok(())
    }

    pub fn load_image(&mut self, image: RasterImage) {
        let (width, height) = image.dimensions();
        debug!(width, height, "editor loaded image");
        self.history = Some(History::new(image));
        self.canvas_width = width;
        self.canvas_height = height;
        self.transform = ObjectTransform::default();
    }

    fn history(&self) -> Result<&History> {
        self.history.as_ref().ok_or_else(CanvasError::no_image_loaded)
    }

    fn history_mut(&mut self) -> Result<&mut History> {
        self.history.as_mut().ok_or_else(CanvasError::no_image_loaded)
    }

    /// The image under the history cursor.
    pub fn current(&self) -> Result<&RasterImage> {
        Ok(self.history()?.current())
    }

    /// The image as first loaded.
    pub fn original(&self) -> Result<&RasterImage> {
        Ok(self.history()?.original())
    }

    pub fn history_len(&self) -> usize {
        self.history.as_ref().map_or(0, History::len)
    }

    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(History::can_undo)
    }

    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(History::can_redo)
    }

    // =========================================================================
    // EDITS (each pushes a history entry)
    // =========================================================================

    fn push_and_reset(&mut self, image: RasterImage) -> Result<()> {
        let (width, height) = image.dimensions();
        self.history_mut()?.push(image);
        self.canvas_width = width;
        self.canvas_height = height;
        self.transform = ObjectTransform::default();
        Ok(())
    }

    /// Crop the originally loaded image (transparent fill) and switch to
    /// stretch mode at the cropped size.
    pub fn crop_original(&mut self, crop: &PixelCrop) -> Result<()> {
        let cropped = render_crop(self.original()?, crop, &Background::Transparent)?;
        self.push_and_reset(cropped)?;
        self.fit = FitMode::Stretch;
        Ok(())
    }

    /// Crop the current image again, filling uncovered area with `background`.
    pub fn crop(&mut self, crop: &PixelCrop, background: &Background) -> Result<()> {
        let cropped = render_crop(self.current()?, crop, background)?;
        self.push_and_reset(cropped)
    }

    /// Render the current canvas settings into a new raster without committing it.
    pub fn preview(&self) -> Result<RasterImage> {
        compose(
            self.current()?,
            self.canvas_width,
            self.canvas_height,
            self.fit,
            &self.background,
            &self.transform,
        )
    }

    /// Commit the current canvas settings as a new history entry.
    pub fn apply_canvas(&mut self) -> Result<()> {
        let composed = self.preview()?;
        self.push_and_reset(composed)
    }

    /// Replace the current image with the collaborator's background-free version.
    ///
    /// Awaited once, no retry. Collaborator failures surface as
    /// `ExternalServiceFailed` and leave the session untouched.
    pub async fn remove_background<R: BackgroundRemover>(&mut self, remover: &R) -> Result<()> {
        let input = self.current()?.clone();
        let output = remover
            .remove_background(&input)
            .await
            .map_err(external_failure)?;
        debug!(
            from = ?input.dimensions(),
            to = ?output.dimensions(),
            "background removed"
        );
        self.push_and_reset(output)
    }

    /// Step back one history entry. No-op at the original.
    pub fn undo(&mut self) -> bool {
        self.step(History::undo)
    }

    pub fn redo(&mut self) -> bool {
        self.step(History::redo)
    }

    fn step(&mut self, action: fn(&mut History) -> bool) -> bool {
        let Some(history) = self.history.as_mut() else {
            return false;
        };
        if !action(history) {
            return false;
        }
        let (width, height) = history.current().dimensions();
        self.canvas_width = width;
        self.canvas_height = height;
        self.transform = ObjectTransform::default();
        true
    }

    // =========================================================================
    // CANVAS PARAMETERS
    // =========================================================================

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    /// Set both canvas dimensions explicitly.
    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(CanvasError::invalid_target_size(
                f64::from(width),
                f64::from(height),
            ));
        }
        crate::engine::check_dimensions(width, height)?;
        self.canvas_width = width;
        self.canvas_height = height;
        Ok(())
    }

    /// Change one canvas side; with "maintain aspect" on, the other side
    /// follows the current image's aspect ratio.
    pub fn resize_canvas(&mut self, axis: Axis, value: u32) -> Result<()> {
        let (width, height) = if self.maintain_aspect {
            lock_aspect(axis, value, self.current()?.aspect_ratio())?
        } else {
            match axis {
                Axis::Width => (value, self.canvas_height),
                Axis::Height => (self.canvas_width, value),
            }
        };
        self.set_canvas_size(width, height)
    }

    /// Jump to a preset size. Turns "maintain aspect" off.
    pub fn apply_preset(&mut self, preset: &SizePreset) -> Result<()> {
        self.maintain_aspect = false;
        self.set_canvas_size(preset.width, preset.height)
    }

    pub fn maintain_aspect(&self) -> bool {
        self.maintain_aspect
    }

    pub fn set_maintain_aspect(&mut self, on: bool) {
        self.maintain_aspect = on;
    }

    pub fn fit(&self) -> FitMode {
        self.fit
    }

    pub fn set_fit(&mut self, fit: FitMode) {
        self.fit = fit;
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
    }

    pub fn transform(&self) -> ObjectTransform {
        self.transform
    }

    /// Set the object scale, clamped to the editor's scale range.
    pub fn set_scale(&mut self, scale: f64) {
        let (min, max) = ObjectTransform::EDITOR_SCALE_RANGE;
        self.transform = self.transform.with_scale_clamped(scale, min, max);
    }

    /// Move the object by (`dx`, `dy`) canvas pixels.
    ///
    /// A centered object first gets its centered offset made explicit, so the
    /// drag starts where the object is drawn.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Result<()> {
        require_finite("offset", dx, dy)?;
        let image = self.current()?;
        let start = resolve_position(
            image.width(),
            image.height(),
            f64::from(self.canvas_width),
            f64::from(self.canvas_height),
            self.fit,
            &self.transform,
        )?;
        let (x, y) = (start.x + dx, start.y + dy);
        require_finite("position", x, y)?;
        self.transform.position = Some(Point::new(x, y));
        Ok(())
    }

    /// Back to centered.
    pub fn reset_position(&mut self) {
        self.transform.position = None;
    }

    // =========================================================================
    // EXPORT
    // =========================================================================

    /// Encode the current image.
    pub fn export(&self, settings: &ExportSettings) -> Result<ExportBlob> {
        export(self.current()?, settings, &self.encoder)
    }
}

// =============================================================================
// COLLAGE EDITOR
// =============================================================================

/// Multi-cell collage session.
#[derive(Debug, Clone)]
pub struct CollageEditor {
    template: LayoutTemplate,
    layout: Layout,
    bindings: CellBindings,
    maintain_aspect: bool,
    locked_aspect: f64,
    encoder: EncoderConfig,
}

impl CollageEditor {
    /// Single-cell template on the default 1200x1080 canvas.
    pub fn new() -> Result<Self> {
        Self::with_template(
            LayoutTemplate::Single,
            DEFAULT_CANVAS_WIDTH,
            DEFAULT_CANVAS_HEIGHT,
        )
    }

    pub fn with_template(template: LayoutTemplate, canvas_width: u32, canvas_height: u32) -> Result<Self> {
        let layout = template.layout(canvas_width, canvas_height)?;
        Ok(Self {
            template,
            layout,
            bindings: CellBindings::new(),
            maintain_aspect: false,
            locked_aspect: f64::from(canvas_width) / f64::from(canvas_height),
            encoder: EncoderConfig::default(),
        })
    }

    pub fn with_encoder_config(mut self, config: EncoderConfig) -> Self {
        self.encoder = config;
        self
    }

    pub fn template(&self) -> LayoutTemplate {
        self.template
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn bindings(&self) -> &CellBindings {
        &self.bindings
    }

    pub fn binding(&self, cell_id: &str) -> Option<&CellImage> {
        self.bindings.get(cell_id)
    }

    /// Switch template. All bindings are cleared.
    pub fn set_template(&mut self, template: LayoutTemplate) -> Result<()> {
        let (width, height) = self.layout.canvas_size();
        self.layout = template.layout(width, height)?;
        self.template = template;
        self.bindings.clear();
        Ok(())
    }

    // =========================================================================
    // CANVAS SIZE
    // =========================================================================

    pub fn canvas_size(&self) -> (u32, u32) {
        self.layout.canvas_size()
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> Result<()> {
        self.layout = self.layout.with_canvas_size(width, height)?;
        Ok(())
    }

    /// Change one side; with "maintain aspect" on, the other follows the aspect
    /// captured when the lock was enabled (or the last preset applied).
    pub fn resize_canvas(&mut self, axis: Axis, value: u32) -> Result<()> {
        let (current_w, current_h) = self.canvas_size();
        let (width, height) = if self.maintain_aspect {
            lock_aspect(axis, value, self.locked_aspect)?
        } else {
            match axis {
                Axis::Width => (value, current_h),
                Axis::Height => (current_w, value),
            }
        };
        self.set_canvas_size(width, height)
    }

    pub fn apply_preset(&mut self, preset: &SizePreset) -> Result<()> {
        self.set_canvas_size(preset.width, preset.height)?;
        self.maintain_aspect = false;
        self.locked_aspect = f64::from(preset.width) / f64::from(preset.height);
        Ok(())
    }

    pub fn set_maintain_aspect(&mut self, on: bool) {
        if on && !self.maintain_aspect {
            let (width, height) = self.canvas_size();
            self.locked_aspect = f64::from(width) / f64::from(height);
        }
        self.maintain_aspect = on;
    }

    // =========================================================================
    // BINDINGS
    // =========================================================================

    /// Bind `image` to `cell_id`, replacing any previous binding and resetting pan/zoom.
    pub fn assign(&mut self, cell_id: &str, image: RasterImage) -> Result<()> {
        self.layout.require_cell(cell_id)?;
        let binding = CellImage::new(cell_id, image);
        debug!(
            cell = cell_id,
            has_transparency = binding.has_transparency,
            "bound cell image"
        );
        self.bindings.insert(cell_id.to_string(), binding);
        Ok(())
    }

    /// Decode `bytes` and bind the result to `cell_id`.
    pub fn assign_bytes(&mut self, cell_id: &str, bytes: &[u8]) -> Result<()> {
        self.layout.require_cell(cell_id)?;
        self.assign(cell_id, RasterImage::decode(bytes)?)
    }

    /// Unbind `cell_id`. Returns the removed binding, if any.
    pub fn remove(&mut self, cell_id: &str) -> Option<CellImage> {
        self.bindings.remove(cell_id)
    }

    fn binding_mut(&mut self, cell_id: &str) -> Result<&mut CellImage> {
        self.layout.require_cell(cell_id)?;
        let layout_id = self.layout.id().to_string();
        self.bindings
            .get_mut(cell_id)
            .ok_or_else(|| CanvasError::unknown_cell(cell_id.to_string(), layout_id))
    }

    /// Move the image inside its cell by (`dx`, `dy`) canvas pixels.
    pub fn pan(&mut self, cell_id: &str, dx: f64, dy: f64) -> Result<()> {
        require_finite("offset", dx, dy)?;
        let binding = self.binding_mut(cell_id)?;
        let (x, y) = (binding.position_x + dx, binding.position_y + dy);
        require_finite("position", x, y)?;
        binding.position_x = x;
        binding.position_y = y;
        Ok(())
    }

    /// Add `delta` to the cell's zoom, clamped to the cell scale range.
    pub fn zoom(&mut self, cell_id: &str, delta: f64) -> Result<f64> {
        if !delta.is_finite() {
            return Err(CanvasError::invalid_argument("zoom", delta.to_string(), "must be finite"));
        }
        let binding = self.binding_mut(cell_id)?;
        let (min, max) = CELL_SCALE_RANGE;
        binding.scale = (binding.scale + delta).clamp(min, max);
        Ok(binding.scale)
    }

    // =========================================================================
    // RENDER / EXPORT
    // =========================================================================

    /// Render the collage with the background policy for `settings.format`.
    pub fn render(&self, settings: &ExportSettings) -> Result<RasterImage> {
        render_collage(&self.layout, &self.bindings, settings.format)
    }

    pub fn export(&self, settings: &ExportSettings) -> Result<ExportBlob> {
        settings.validate()?;
        let canvas = self.render(settings)?;
        export(&canvas, settings, &self.encoder)
    }
}
