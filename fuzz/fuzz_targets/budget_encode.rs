#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use snapframe::engine::{export, EncoderConfig};
use snapframe::{ExportSettings, OutputFormat, RasterImage};

#[derive(Arbitrary, Debug)]
struct EncodeSeed {
    width: u8,
    height: u8,
    png: bool,
    quality: u8,
    max_size_kb: Option<u8>,
    pixels: Vec<u8>,
}

fuzz_target!(|seed: EncodeSeed| {
    let width = u32::from(seed.width % 64) + 1;
    let height = u32::from(seed.height % 64) + 1;
    let len = (width * height * 4) as usize;
    let mut buffer = vec![0u8; len];
    if !seed.pixels.is_empty() {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = seed.pixels[i % seed.pixels.len()];
        }
    }
    let Some(rgba) = image::RgbaImage::from_raw(width, height, buffer) else {
        return;
    };
    let Ok(img) = RasterImage::from_rgba(rgba) else {
        return;
    };

    let settings = ExportSettings {
        format: if seed.png { OutputFormat::Png } else { OutputFormat::Jpeg },
        quality: f32::from(seed.quality) / 255.0,
        max_size_kb: seed.max_size_kb.map(|kb| u32::from(kb) + 1),
    };
    let config = EncoderConfig {
        png_optimization_level: 1,
        ..EncoderConfig::default()
    };

    // An unreachable budget is a warning, never an error
    let blob = export(&img, &settings, &config).expect("export must not fail on valid input");
    assert!(!blob.is_empty());
    if let (Some(budget), None) = (settings.budget_bytes(), blob.warning) {
        assert!(blob.len() as u64 <= budget);
    }
});
