#![no_main]

use libfuzzer_sys::fuzz_target;
use snapframe::RasterImage;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Decode must either succeed within limits or return an error, never panic
    if let Ok(img) = RasterImage::decode(data) {
        let (w, h) = img.dimensions();
        assert!(w > 0 && h > 0);
        assert_eq!(img.as_rgba().len(), w as usize * h as usize * 4);
    }
});
