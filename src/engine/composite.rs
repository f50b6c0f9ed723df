// src/engine/composite.rs
//
// Straight-alpha source-over on RGBA8 buffers.

use image::RgbaImage;

pub type Rgba8 = [u8; 4];

fn mul_div255(x: u32, y: u32) -> u32 {
    (x * y + 127) / 255
}

/// Source-over of one straight-alpha pixel onto another.
///
/// Exact when `src` is opaque, fully transparent, or `dst` is fully transparent,
/// so copying onto a clear canvas reproduces the source bit-for-bit.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u32::from(src[3]);
    let da = u32::from(dst[3]);
    if sa == 255 || da == 0 {
        return src;
    }
    if sa == 0 {
        return dst;
    }

    let da_scaled = mul_div255(da, 255 - sa);
    let out_a = sa + da_scaled;
    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = u32::from(src[i]) * sa + u32::from(dst[i]) * da_scaled;
        out[i] = ((c + out_a / 2) / out_a).min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    out
}

/// Composite `src` onto `dst` with its top-left at (`x`, `y`).
/// Parts of `src` that fall outside `dst` are dropped.
pub fn over_at(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    let (sw, sh) = (i64::from(src.width()), i64::from(src.height()));

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for dy in y0..y1 {
        let sy = (dy - y) as u32;
        for dx in x0..x1 {
            let sx = (dx - x) as u32;
            let s = src.get_pixel(sx, sy).0;
            let d = dst.get_pixel_mut(dx as u32, dy as u32);
            d.0 = over(d.0, s);
        }
    }
}

/// Paint every pixel of `canvas` with `rgba`.
pub fn fill(canvas: &mut RgbaImage, rgba: Rgba8) {
    for px in canvas.pixels_mut() {
        px.0 = rgba;
    }
}

/// Matte onto an opaque color, producing a fully opaque image.
pub fn flatten_onto(src: &RgbaImage, matte: Rgba8) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(src.width(), src.height(), image::Rgba(matte));
    over_at(&mut out, src, 0, 0);
    out
}
