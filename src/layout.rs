// src/layout.rs
//
// Collage layouts: percent-space cells on a pixel canvas, plus the built-in templates.

use crate::error::CanvasError;
use crate::ops::Rect;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default collage canvas size.
pub const DEFAULT_CANVAS_WIDTH: u32 = 1200;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1080;

/// A cell in percent space (0-100) of the layout canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutCell {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutCell {
    /// Every field must be finite and inside 0-100; width and height must be positive.
    /// A cell may still reach past the canvas edge, it is clipped at render time.
    fn validate(&self) -> Result<(), CanvasError> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ];
        for (field, value) in fields {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(CanvasError::invalid_argument(
                    format!("cell {}.{field}", self.id),
                    value.to_string(),
                    "must be a finite percentage in 0-100",
                ));
            }
        }
        if self.width == 0.0 || self.height == 0.0 {
            return Err(CanvasError::invalid_cell_bounds(
                self.id.clone(),
                self.width,
                self.height,
            ));
        }
        Ok(())
    }

    pub fn new(id: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
        }
    }
}

/// A concrete collage layout. Cell ids are unique; cells need not tile.
///
/// Deserializing goes through [`Layout::new`], so a layout read from JSON
/// holds the same invariants as one built in code.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutRaw")]
pub struct Layout {
    id: String,
    name: String,
    cells: Vec<LayoutCell>,
    canvas_width: u32,
    canvas_height: u32,
    gap: f64,
}

/// Unchecked wire shape of [`Layout`].
#[derive(Deserialize)]
struct LayoutRaw {
    id: String,
    name: String,
    cells: Vec<LayoutCell>,
    canvas_width: u32,
    canvas_height: u32,
    gap: f64,
}

impl TryFrom<LayoutRaw> for Layout {
    type Error = CanvasError;

    fn try_from(raw: LayoutRaw) -> Result<Self, Self::Error> {
        Layout::new(
            raw.id,
            raw.name,
            raw.cells,
            raw.canvas_width,
            raw.canvas_height,
            raw.gap,
        )
    }
}

impl Layout {
    /// Build a layout, rejecting duplicate cell ids, out-of-range cells and a
    /// zero-sized canvas.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cells: Vec<LayoutCell>,
        canvas_width: u32,
        canvas_height: u32,
        gap: f64,
    ) -> Result<Self, CanvasError> {
        let id = id.into();
        let mut seen = HashSet::with_capacity(cells.len());
        for cell in &cells {
            if !seen.insert(cell.id.as_str()) {
                return Err(CanvasError::duplicate_cell(cell.id.clone(), id));
            }
            cell.validate()?;
        }
        if canvas_width == 0 || canvas_height == 0 {
            return Err(CanvasError::invalid_target_size(
                f64::from(canvas_width),
                f64::from(canvas_height),
            ));
        }
        crate::engine::check_dimensions(canvas_width, canvas_height)?;
        if !gap.is_finite() || gap < 0.0 {
            return Err(CanvasError::invalid_argument(
                "gap",
                gap.to_string(),
                "must be finite and >= 0",
            ));
        }
        Ok(Self {
            id,
            name: name.into(),
            cells,
            canvas_width,
            canvas_height,
            gap,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[LayoutCell] {
        &self.cells
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.canvas_width, self.canvas_height)
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    pub fn cell(&self, cell_id: &str) -> Option<&LayoutCell> {
        self.cells.iter().find(|c| c.id == cell_id)
    }

    /// Same cells on a different canvas.
    pub fn with_canvas_size(&self, canvas_width: u32, canvas_height: u32) -> Result<Self, CanvasError> {
        Self::new(
            self.id.clone(),
            self.name.clone(),
            self.cells.clone(),
            canvas_width,
            canvas_height,
            self.gap,
        )
    }

    /// Pixel rect of `cell`, inset by the gap on every side.
    pub fn cell_bounds(&self, cell: &LayoutCell) -> Result<Rect, CanvasError> {
        let w = f64::from(self.canvas_width);
        let h = f64::from(self.canvas_height);
        let bounds = Rect::new(
            cell.x / 100.0 * w + self.gap,
            cell.y / 100.0 * h + self.gap,
            cell.width / 100.0 * w - 2.0 * self.gap,
            cell.height / 100.0 * h - 2.0 * self.gap,
        );
        if !bounds.is_drawable() {
            return Err(CanvasError::invalid_cell_bounds(
                cell.id.clone(),
                bounds.width,
                bounds.height,
            ));
        }
        Ok(bounds)
    }

    /// Resolve `cell_id` or fail with `UnknownCell`.
    pub fn require_cell(&self, cell_id: &str) -> Result<&LayoutCell, CanvasError> {
        self.cell(cell_id)
            .ok_or_else(|| CanvasError::unknown_cell(cell_id.to_string(), self.id.clone()))
    }
}

/// Built-in layout templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutTemplate {
    Single,
    SplitHorizontal,
    SplitVertical,
    ThreeLeftRight,
    FourGrid,
}

impl LayoutTemplate {
    pub const ALL: [LayoutTemplate; 5] = [
        LayoutTemplate::Single,
        LayoutTemplate::SplitHorizontal,
        LayoutTemplate::SplitVertical,
        LayoutTemplate::ThreeLeftRight,
        LayoutTemplate::FourGrid,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            LayoutTemplate::Single => "single",
            LayoutTemplate::SplitHorizontal => "split-horizontal",
            LayoutTemplate::SplitVertical => "split-vertical",
            LayoutTemplate::ThreeLeftRight => "three-left-right",
            LayoutTemplate::FourGrid => "four-grid",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayoutTemplate::Single => "Single",
            LayoutTemplate::SplitHorizontal => "Side by side (1:1)",
            LayoutTemplate::SplitVertical => "Top and bottom",
            LayoutTemplate::ThreeLeftRight => "Three (1 left, 2 right)",
            LayoutTemplate::FourGrid => "Four grid",
        }
    }

    pub fn gap(&self) -> f64 {
        match self {
            LayoutTemplate::Single => 0.0,
            _ => 10.0,
        }
    }

    pub fn cells(&self) -> Vec<LayoutCell> {
        let c = LayoutCell::new;
        match self {
            LayoutTemplate::Single => vec![c("cell-1", 0.0, 0.0, 100.0, 100.0)],
            LayoutTemplate::SplitHorizontal => vec![
                c("cell-1", 0.0, 0.0, 50.0, 100.0),
                c("cell-2", 50.0, 0.0, 50.0, 100.0),
            ],
            LayoutTemplate::SplitVertical => vec![
                c("cell-1", 0.0, 0.0, 100.0, 50.0),
                c("cell-2", 0.0, 50.0, 100.0, 50.0),
            ],
            LayoutTemplate::ThreeLeftRight => vec![
                c("cell-1", 0.0, 0.0, 50.0, 100.0),
                c("cell-2", 50.0, 0.0, 50.0, 50.0),
                c("cell-3", 50.0, 50.0, 50.0, 50.0),
            ],
            LayoutTemplate::FourGrid => vec![
                c("cell-1", 0.0, 0.0, 50.0, 50.0),
                c("cell-2", 50.0, 0.0, 50.0, 50.0),
                c("cell-3", 0.0, 50.0, 50.0, 50.0),
                c("cell-4", 50.0, 50.0, 50.0, 50.0),
            ],
        }
    }

    /// Look up a template by id.
    pub fn get(id: &str) -> Result<Self, CanvasError> {
        id.parse()
    }

    /// Instantiate against a canvas size.
    pub fn layout(&self, canvas_width: u32, canvas_height: u32) -> Result<Layout, CanvasError> {
        Layout::new(
            self.id(),
            self.name(),
            self.cells(),
            canvas_width,
            canvas_height,
            self.gap(),
        )
    }
}

impl std::str::FromStr for LayoutTemplate {
    type Err = CanvasError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        LayoutTemplate::ALL
            .into_iter()
            .find(|t| t.id() == id.to_lowercase())
            .ok_or_else(|| CanvasError::invalid_template(id.to_string()))
    }
}
