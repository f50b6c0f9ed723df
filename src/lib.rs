// lib.rs
//
// snapframe: crop, fit, collage and size-budgeted export for raster images
//
// Design goals:
// - Pure, synchronous geometry and compositing (no global state)
// - Straight-alpha RGBA throughout, flattened only for JPEG
// - Hard clipping for collage cells
// - Exports that honor a byte budget without ever failing on it

pub mod engine;
pub mod error;
pub mod layout;
pub mod ops;
pub mod presets;
pub mod raster;

pub use engine::{
    BackgroundRemover, BudgetWarning, CellImage, CollageEditor, EncoderConfig, ExportBlob,
    ImageEditor, ImageHeader,
};
pub use error::{CanvasError, ErrorCategory, Result};
pub use layout::{Layout, LayoutCell, LayoutTemplate};
pub use ops::{
    Background, ExportSettings, FitMode, ObjectTransform, OutputFormat, PixelCrop, Point,
    PresetCategory, Rect, SizePreset,
};
pub use presets::{JsonFilePresetStore, MemoryPresetStore, PresetStore};
pub use raster::RasterImage;

/// Inspect dimensions and format WITHOUT decoding pixels.
///
/// Use this to reject oversized images before paying for a decode.
pub fn inspect_header_from_bytes(data: &[u8]) -> Result<ImageHeader> {
    engine::inspect_header(data)
}

/// Inspect a file's header through a memory map.
pub fn inspect_header_from_path(path: impl AsRef<std::path::Path>) -> Result<ImageHeader> {
    let file = engine::MappedFile::open(path.as_ref())?;
    engine::inspect_header(file.as_bytes())
}

/// Library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Input formats accepted by the decoders.
pub fn supported_input_formats() -> &'static [&'static str] {
    &["jpeg", "jpg", "png", "webp"]
}

/// Output formats the exporter can produce.
pub fn supported_output_formats() -> &'static [&'static str] {
    &["jpeg", "jpg", "png"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_header_from_bytes() {
        let img = RasterImage::filled(7, 5, [0, 0, 0, 255]).unwrap();
        let png = engine::encode_png(&img.to_dynamic(), 0).unwrap();
        let header = inspect_header_from_bytes(&png).unwrap();
        assert_eq!((header.width, header.height), (7, 5));
        assert_eq!(header.format, Some(image::ImageFormat::Png));
    }

    #[test]
    fn test_inspect_header_rejects_garbage() {
        let err = inspect_header_from_bytes(b"definitely not an image").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::CodecError);
    }

    #[test]
    fn test_inspect_header_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.png");
        let img = RasterImage::filled(9, 3, [0, 0, 0, 255]).unwrap();
        std::fs::write(&path, engine::encode_png(&img.to_dynamic(), 0).unwrap()).unwrap();
        let header = inspect_header_from_path(&path).unwrap();
        assert_eq!((header.width, header.height), (9, 3));
    }

    #[test]
    fn test_inspect_header_missing_file() {
        let err = inspect_header_from_path("/nonexistent/snapframe.png").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ResourceLimit);
    }
}
