// src/engine.rs
//
// The core of snapframe:
// 1. Decode (memory-mapped or in-memory, EXIF-oriented)
// 2. Geometry: fit modes, crop, pan/zoom placement
// 3. Compositing onto a canvas or into collage cells
// 4. Size-budgeted export
//
// This file is a facade over the modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod api;
mod collage;
mod common;
mod composite;
mod decoder;
mod encoder;
mod geometry;
mod history;
mod io;
mod pipeline;
mod remote;
mod sampler;

pub use api::{CollageEditor, ImageEditor, COLLAGE_STEM, EDITED_IMAGE_STEM};
pub use collage::{collage_background, render_collage, CellBindings, CellImage, CELL_SCALE_RANGE};
pub use common::{run_with_panic_policy, EngineResult};
pub use composite::{flatten_onto, over, over_at};
pub use decoder::{
    apply_exif_orientation, check_dimensions, decode_image, decode_jpeg_mozjpeg, decode_oriented,
    decode_png_zune, detect_exif_orientation, detect_format, inspect_header, ImageHeader,
};
pub use encoder::{
    encode, encode_jpeg, encode_png, export, jpeg_quality, search_quality, BudgetWarning,
    EncoderConfig, ExportBlob, SearchOutcome,
};
pub use geometry::{fit_rect, fit_rect_for_aspect, lock_aspect, resolve_position, Axis, DrawRect};
pub use history::History;
pub use io::{write_atomic, MappedFile};
pub use pipeline::{compose, draw_scaled, render_crop};
pub use remote::{external_failure, BackgroundRemover, BACKGROUND_REMOVAL};
pub use sampler::has_transparency;
