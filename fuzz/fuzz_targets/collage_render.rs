#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use snapframe::engine::{render_collage, CellBindings, CellImage};
use snapframe::{LayoutTemplate, OutputFormat, RasterImage};

#[derive(Arbitrary, Debug)]
struct CellSeed {
    slot: u8,
    width: u8,
    height: u8,
    rgba: [u8; 4],
    scale: f32,
    pan_x: i16,
    pan_y: i16,
}

#[derive(Arbitrary, Debug)]
struct CollageSeed {
    template: u8,
    canvas_width: u16,
    canvas_height: u16,
    png: bool,
    cells: Vec<CellSeed>,
}

fuzz_target!(|seed: CollageSeed| {
    let template = LayoutTemplate::ALL[seed.template as usize % LayoutTemplate::ALL.len()];
    let width = u32::from(seed.canvas_width % 512) + 1;
    let height = u32::from(seed.canvas_height % 512) + 1;
    let Ok(layout) = template.layout(width, height) else {
        return;
    };

    let mut bindings = CellBindings::new();
    for cell in seed.cells.into_iter().take(8) {
        let id = &layout.cells()[cell.slot as usize % layout.cells().len()].id;
        let Ok(image) = RasterImage::filled(
            u32::from(cell.width) + 1,
            u32::from(cell.height) + 1,
            cell.rgba,
        ) else {
            continue;
        };
        let mut binding = CellImage::new(id.clone(), image);
        if cell.scale.is_finite() {
            binding.scale = f64::from(cell.scale.abs() % 3.0);
        }
        binding.position_x = f64::from(cell.pan_x);
        binding.position_y = f64::from(cell.pan_y);
        bindings.insert(id.clone(), binding);
    }

    let format = if seed.png { OutputFormat::Png } else { OutputFormat::Jpeg };
    if let Ok(canvas) = render_collage(&layout, &bindings, format) {
        assert_eq!(canvas.dimensions(), (width, height));
    }
});
