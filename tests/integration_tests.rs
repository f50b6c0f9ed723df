// tests/integration_tests.rs
//
// Integration tests for the public editing API.
// These exercise the editors end to end: decode -> edit -> export -> decode.

use image::{Rgba, RgbaImage};
use snapframe::engine::{Axis, BudgetWarning, CollageEditor, EDITED_IMAGE_STEM};
use snapframe::{
    Background, BackgroundRemover, CanvasError, ErrorCategory, ExportSettings, FitMode,
    ImageEditor, JsonFilePresetStore, LayoutTemplate, OutputFormat, PresetCategory, PresetStore,
    RasterImage, Rect, Result, SizePreset,
};
use std::future::Future;

fn gradient(width: u32, height: u32) -> RasterImage {
    RasterImage::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8, 255])
    }))
    .unwrap()
}

fn png_bytes(img: &RasterImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.as_rgba()
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Cuts out a centered disc, leaving the outside transparent.
struct DiscCutout;

impl BackgroundRemover for DiscCutout {
    fn remove_background(&self, image: &RasterImage) -> impl Future<Output = Result<RasterImage>> + Send {
        let src = image.as_rgba().clone();
        async move {
            let (w, h) = src.dimensions();
            let (cx, cy, r) = (w as f64 / 2.0, h as f64 / 2.0, w.min(h) as f64 / 2.0);
            let out = RgbaImage::from_fn(w, h, |x, y| {
                let d = ((x as f64 + 0.5 - cx).powi(2) + (y as f64 + 0.5 - cy).powi(2)).sqrt();
                if d <= r {
                    *src.get_pixel(x, y)
                } else {
                    Rgba([0, 0, 0, 0])
                }
            });
            RasterImage::from_rgba(out)
        }
    }
}

struct Offline;

impl BackgroundRemover for Offline {
    fn remove_background(&self, _image: &RasterImage) -> impl Future<Output = Result<RasterImage>> + Send {
        async { Err(CanvasError::external_service_failed("background removal", "no API key configured")) }
    }
}

#[test]
fn test_scenario_contain_800x400() {
    let mut editor = ImageEditor::new();
    editor.load_image(RasterImage::filled(1000, 1000, [0, 128, 0, 255]).unwrap());
    editor.set_maintain_aspect(false);
    editor.set_canvas_size(800, 400).unwrap();
    editor.set_fit(FitMode::Contain);
    editor.set_background(Background::Transparent);

    let preview = editor.preview().unwrap();
    assert_eq!(preview.dimensions(), (800, 400));
    assert_eq!(preview.pixel(199, 200)[3], 0);
    assert_eq!(preview.pixel(200, 200), [0, 128, 0, 255]);
    assert_eq!(preview.pixel(599, 0), [0, 128, 0, 255]);
    assert_eq!(preview.pixel(600, 200)[3], 0);
    // preview does not commit
    assert_eq!(editor.history_len(), 1);
}

#[test]
fn test_scenario_crop_beyond_source() {
    let src = gradient(50, 50);
    let mut editor = ImageEditor::new();
    editor.load(&png_bytes(&src)).unwrap();
    editor
        .crop_original(&Rect::new(10.0, 10.0, 100.0, 100.0))
        .unwrap();

    let out = editor.current().unwrap();
    assert_eq!(out.dimensions(), (100, 100));
    for (x, y, px) in out.as_rgba().enumerate_pixels() {
        if x < 40 && y < 40 {
            assert_eq!(px.0, src.pixel(x + 10, y + 10));
        } else {
            assert_eq!(px.0[3], 0, "({x},{y}) should be transparent");
        }
    }
    assert_eq!(editor.canvas_size(), (100, 100));
    assert_eq!(editor.fit(), FitMode::Stretch);
}

#[test]
fn test_editor_session_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.png");
    std::fs::write(&input, png_bytes(&gradient(64, 48))).unwrap();

    let mut editor = ImageEditor::new();
    editor.open(&input).unwrap();
    editor.resize_canvas(Axis::Width, 128).unwrap();
    assert_eq!(editor.canvas_size(), (128, 96));
    editor.apply_canvas().unwrap();
    editor.crop(&Rect::new(0.0, 0.0, 64.0, 64.0), &Background::white()).unwrap();
    assert_eq!(editor.history_len(), 3);

    let blob = editor.export(&ExportSettings::png()).unwrap();
    let out = dir.path().join(blob.suggested_filename(EDITED_IMAGE_STEM));
    blob.write_to(&out).unwrap();
    assert!(out.ends_with("edited-image.png"));

    let reopened = RasterImage::open(&out).unwrap();
    assert_eq!(reopened.dimensions(), (64, 64));
    assert_eq!(
        reopened.as_rgba().as_raw(),
        editor.current().unwrap().as_rgba().as_raw()
    );
}

#[test]
fn test_undo_past_original_is_noop() {
    let mut editor = ImageEditor::new();
    editor.load_image(gradient(10, 10));
    assert!(!editor.can_undo());
    assert!(!editor.undo());
    assert_eq!(editor.history_len(), 1);
    assert_eq!(editor.current().unwrap().dimensions(), (10, 10));
}

#[test]
fn test_new_edit_after_undo_drops_redo() {
    let mut editor = ImageEditor::new();
    editor.load_image(gradient(40, 40));
    editor.crop_original(&Rect::new(0.0, 0.0, 20.0, 20.0)).unwrap();
    assert!(editor.undo());
    assert!(editor.can_redo());
    editor.crop(&Rect::new(0.0, 0.0, 10.0, 10.0), &Background::white()).unwrap();
    assert!(!editor.can_redo());
    assert_eq!(editor.current().unwrap().dimensions(), (10, 10));
}

#[test]
fn test_background_removal_then_transparent_png() {
    let mut editor = ImageEditor::new();
    editor.load_image(gradient(32, 32));
    pollster::block_on(editor.remove_background(&DiscCutout)).unwrap();

    let current = editor.current().unwrap();
    assert_eq!(current.pixel(0, 0)[3], 0);
    assert_eq!(current.pixel(16, 16)[3], 255);

    let blob = editor.export(&ExportSettings::png()).unwrap();
    let decoded = RasterImage::decode(&blob.bytes).unwrap();
    assert_eq!(decoded.pixel(0, 0)[3], 0);
}

#[test]
fn test_background_removal_failure_is_external() {
    let mut editor = ImageEditor::new();
    editor.load_image(gradient(8, 8));
    let err = pollster::block_on(editor.remove_background(&Offline)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ExternalFailure);
    assert!(err.is_recoverable());
    assert_eq!(editor.history_len(), 1);
}

#[test]
fn test_jpeg_budget_is_met() {
    let mut editor = ImageEditor::new();
    editor.load_image(gradient(512, 512));
    let unconstrained = editor.export(&ExportSettings::jpeg(1.0)).unwrap();
    let budget_kb = (unconstrained.len() / 1024 / 2).max(8) as u32;

    let blob = editor
        .export(&ExportSettings::jpeg(1.0).with_max_size_kb(budget_kb))
        .unwrap();
    assert!(blob.len() as u64 <= u64::from(budget_kb) * 1024);
    assert!(blob.warning.is_none());
    assert!(blob.quality.unwrap() < 1.0);
    assert_eq!(blob.mime_type(), "image/jpeg");
}

#[test]
fn test_png_budget_warns_instead_of_failing() {
    let mut editor = ImageEditor::new();
    editor.load_image(gradient(256, 256));
    let blob = editor
        .export(&ExportSettings::png().with_max_size_kb(1))
        .unwrap();
    assert!(matches!(
        blob.warning,
        Some(BudgetWarning::LosslessBudgetIgnored { budget: 1024, .. })
    ));
    assert_eq!(blob.format, OutputFormat::Png);
}

#[test]
fn test_collage_four_grid_export() {
    let mut collage = CollageEditor::with_template(LayoutTemplate::FourGrid, 400, 400).unwrap();
    let colors = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [0, 0, 0, 255]];
    for (i, rgba) in colors.iter().enumerate() {
        let png = png_bytes(&RasterImage::filled(30, 30, *rgba).unwrap());
        collage.assign_bytes(&format!("cell-{}", i + 1), &png).unwrap();
    }

    let canvas = collage.render(&ExportSettings::png()).unwrap();
    assert_eq!(canvas.pixel(100, 100), [255, 0, 0, 255]);
    assert_eq!(canvas.pixel(300, 100), [0, 255, 0, 255]);
    assert_eq!(canvas.pixel(100, 300), [0, 0, 255, 255]);
    assert_eq!(canvas.pixel(300, 300), [0, 0, 0, 255]);
    // gap stays white
    assert_eq!(canvas.pixel(200, 200), [255, 255, 255, 255]);

    let blob = collage.export(&ExportSettings::collage_default()).unwrap();
    assert_eq!(blob.suggested_filename("collage"), "collage.jpg");
}

#[test]
fn test_collage_transparency_all_or_nothing() {
    let mut collage = CollageEditor::with_template(LayoutTemplate::SplitHorizontal, 200, 100).unwrap();
    collage.assign("cell-1", RasterImage::filled(10, 10, [0, 0, 0, 0]).unwrap()).unwrap();
    let png = collage.render(&ExportSettings::png()).unwrap();
    assert_eq!(png.pixel(0, 0)[3], 0);

    collage.assign("cell-2", gradient(10, 10)).unwrap();
    let png = collage.render(&ExportSettings::png()).unwrap();
    assert_eq!(png.pixel(0, 0), [255, 255, 255, 255]);
}

#[test]
fn test_presets_feed_editors() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFilePresetStore::new(dir.path().join("presets.json"));
    let custom = store.add("", 640, 360).unwrap();
    assert_eq!(custom.name, "Custom 1");

    let mut editor = ImageEditor::new();
    editor.load_image(gradient(10, 10));
    editor.apply_preset(&store.load().unwrap()[0]).unwrap();
    assert_eq!(editor.canvas_size(), (640, 360));

    let story = SizePreset::builtin(PresetCategory::Instagram)
        .into_iter()
        .find(|p| p.height == 1920)
        .unwrap();
    let mut collage = CollageEditor::new().unwrap();
    collage.apply_preset(&story).unwrap();
    assert_eq!(collage.canvas_size(), (1080, 1920));
}
