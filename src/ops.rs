// src/ops.rs
//
// Editing parameters: geometry primitives, fit modes, transforms, backgrounds,
// export settings and size presets.
// These are plain values - the expensive work happens in engine/.

use crate::error::CanvasError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A point in target pixel space. May be fractional or negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle.
///
/// Used in absolute pixel space (crops, compositing) and in percentage space
/// (collage cells, 0-100). Values stay fractional until a raster is written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rect is drawable only when both sides are strictly positive (and finite).
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Crop rectangle in source-image pixel space, as supplied by the selection UI.
pub type PixelCrop = Rect;

/// How a source is scaled into a target rect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Uniform scale, whole source visible inside the target
    #[default]
    Contain,
    /// Uniform scale, target fully covered (overflow is clipped by the canvas)
    Cover,
    /// Non-uniform scale to exactly the target size
    Stretch,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Contain => "contain",
            FitMode::Cover => "cover",
            FitMode::Stretch => "stretch",
        }
    }
}

impl FromStr for FitMode {
    type Err = CanvasError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "contain" => Ok(Self::Contain),
            "cover" => Ok(Self::Cover),
            "stretch" | "fill" => Ok(Self::Stretch),
            other => Err(CanvasError::invalid_argument(
                "fit",
                other.to_string(),
                "expected contain, cover or stretch",
            )),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scale plus optional explicit offset for the drawn object.
///
/// `position: None` centers the object in the target. `Some` is the absolute
/// top-left of the drawn object in target pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectTransform {
    pub scale: f64,
    pub position: Option<Point>,
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position: None,
        }
    }
}

impl ObjectTransform {
    /// Scale limits used by the single-image editor's scale handles.
    pub const EDITOR_SCALE_RANGE: (f64, f64) = (0.1, 3.0);

    pub fn centered(scale: f64) -> Self {
        Self {
            scale,
            position: None,
        }
    }

    pub fn at(x: f64, y: f64, scale: f64) -> Self {
        Self {
            scale,
            position: Some(Point::new(x, y)),
        }
    }

    /// Copy with `scale` clamped into `[min, max]`.
    pub fn with_scale_clamped(self, scale: f64, min: f64, max: f64) -> Self {
        if scale.is_nan() {
            return self;
        }
        Self {
            scale: scale.clamp(min, max),
            ..self
        }
    }
}

/// Canvas background policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Alpha-zero canvas, nothing painted
    Transparent,
    /// Solid RGBA fill
    Solid([u8; 4]),
}

impl Default for Background {
    fn default() -> Self {
        Self::white()
    }
}

impl Background {
    pub const WHITE: [u8; 4] = [255, 255, 255, 255];

    pub fn white() -> Self {
        Self::Solid(Self::WHITE)
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Solid([r, g, b, 255])
    }

    /// Fill color to paint, `None` when the canvas should stay untouched.
    pub fn fill(&self) -> Option<[u8; 4]> {
        match self {
            Background::Transparent => None,
            Background::Solid(rgba) if rgba[3] == 0 => None,
            Background::Solid(rgba) => Some(*rgba),
        }
    }
}

impl FromStr for Background {
    type Err = CanvasError;

    /// Accepts `transparent`, `#RGB`, `#RRGGBB` and `#RRGGBBAA`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("transparent") {
            return Ok(Self::Transparent);
        }

        let invalid = || {
            CanvasError::invalid_argument(
                "background",
                trimmed.to_string(),
                "expected 'transparent' or a #RGB, #RRGGBB, #RRGGBBAA hex color",
            )
        };

        let hex = trimmed.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match hex.len() {
            3 => {
                let mut rgba = [0u8, 0, 0, 255];
                for (i, c) in hex.chars().enumerate() {
                    let doubled: String = [c, c].iter().collect();
                    rgba[i] = channel(&doubled)?;
                }
                Ok(Self::Solid(rgba))
            }
            6 | 8 => {
                let mut rgba = [0u8, 0, 0, 255];
                for i in 0..hex.len() / 2 {
                    rgba[i] = channel(&hex[i * 2..i * 2 + 2])?;
                }
                Ok(Self::Solid(rgba))
            }
            _ => Err(invalid()),
        }
    }
}

/// Output format for export
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy, quality-controlled, no alpha channel
    Jpeg,
    /// Lossless, keeps alpha
    #[default]
    Png,
}

impl OutputFormat {
    pub fn is_lossless(&self) -> bool {
        matches!(self, OutputFormat::Png)
    }

    /// Suggested filename extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CanvasError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format.to_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(Self::Jpeg),
            "png" | "image/png" => Ok(Self::Png),
            other => Err(CanvasError::unsupported_format(other.to_string())),
        }
    }
}

/// Export configuration: format, JPEG quality and optional byte budget.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub format: OutputFormat,
    /// 0.0 - 1.0, only meaningful for JPEG
    pub quality: f32,
    /// Upper bound on the encoded size in KiB
    pub max_size_kb: Option<u32>,
}

impl Default for ExportSettings {
    /// Single-image editor defaults: PNG, quality 0.9, no budget.
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: 0.9,
            max_size_kb: None,
        }
    }
}

impl ExportSettings {
    /// Collage defaults: JPEG at full quality, no budget.
    pub fn collage_default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 1.0,
            max_size_kb: None,
        }
    }

    pub fn jpeg(quality: f32) -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality,
            max_size_kb: None,
        }
    }

    pub fn png() -> Self {
        Self {
            format: OutputFormat::Png,
            ..Self::default()
        }
    }

    pub fn with_max_size_kb(mut self, max_size_kb: u32) -> Self {
        self.max_size_kb = Some(max_size_kb);
        self
    }

    /// Byte budget derived from `max_size_kb` (KiB).
    pub fn budget_bytes(&self) -> Option<u64> {
        self.max_size_kb.map(|kb| u64::from(kb) * 1024)
    }

    pub fn validate(&self) -> Result<(), CanvasError> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(CanvasError::invalid_argument(
                "quality",
                self.quality.to_string(),
                "must be within [0, 1]",
            ));
        }
        if self.max_size_kb == Some(0) {
            return Err(CanvasError::invalid_argument(
                "max_size_kb",
                "0",
                "a byte budget must be positive",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// SIZE PRESETS - Common social media canvas sizes
// =============================================================================

/// Built-in preset groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetCategory {
    Universal,
    Facebook,
    Instagram,
    Threads,
}

impl PresetCategory {
    pub const ALL: [PresetCategory; 4] = [
        PresetCategory::Universal,
        PresetCategory::Facebook,
        PresetCategory::Instagram,
        PresetCategory::Threads,
    ];
}

impl FromStr for PresetCategory {
    type Err = CanvasError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_lowercase().as_str() {
            "universal" => Ok(Self::Universal),
            "facebook" => Ok(Self::Facebook),
            "instagram" => Ok(Self::Instagram),
            "threads" => Ok(Self::Threads),
            other => Err(CanvasError::invalid_preset(other.to_string())),
        }
    }
}

/// A named canvas size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizePreset {
    pub name: String,
    #[serde(alias = "w")]
    pub width: u32,
    #[serde(alias = "h")]
    pub height: u32,
    /// Aspect label shown next to built-ins ("1:1", "9:16", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SizePreset {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            label: None,
        }
    }

    fn labeled(name: &str, width: u32, height: u32, label: &str) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            label: Some(label.to_string()),
        }
    }

    /// Built-in presets for a category
    pub fn builtin(category: PresetCategory) -> Vec<SizePreset> {
        match category {
            PresetCategory::Universal => vec![
                Self::labeled("Square", 1080, 1080, "1:1"),
                Self::labeled("Portrait", 1080, 1350, "4:5"),
                Self::labeled("Full portrait (story/Threads)", 1080, 1920, "9:16"),
            ],
            PresetCategory::Facebook => vec![
                Self::labeled("Feed post - landscape", 1200, 630, "1.91:1"),
                Self::labeled("Feed post - square", 1080, 1080, "1:1"),
                Self::labeled("Feed post - portrait", 1080, 1350, "4:5"),
                Self::labeled("Three-photo main (top, landscape)", 1200, 600, "2:1"),
                Self::labeled("Three-photo main (left, portrait)", 600, 1200, "1:2"),
                Self::labeled("Three-photo secondary (square)", 600, 600, "1:1"),
                Self::labeled("Story", 1080, 1920, "9:16"),
            ],
            PresetCategory::Instagram => vec![
                Self::labeled("Post - square", 1080, 1080, "1:1"),
                Self::labeled("Post - portrait", 1080, 1350, "4:5"),
                Self::labeled("Post - landscape", 1080, 566, "1.91:1"),
                Self::labeled("Story / Reels", 1080, 1920, "9:16"),
            ],
            PresetCategory::Threads => vec![
                Self::labeled("Post / carousel", 1080, 1920, "9:16"),
                Self::labeled("Link preview", 1200, 600, "2:1"),
            ],
        }
    }

    /// Get the built-in presets by category name
    pub fn get(category: &str) -> Result<Vec<SizePreset>, CanvasError> {
        Ok(Self::builtin(category.parse()?))
    }
}
