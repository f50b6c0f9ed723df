use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use image::{Rgba, RgbaImage};
use snapframe::engine::{compose, export, render_collage, CellBindings, CellImage, EncoderConfig};
use snapframe::{Background, ExportSettings, FitMode, LayoutTemplate, ObjectTransform, OutputFormat, RasterImage};
use std::hint::black_box;

fn photo_like(width: u32, height: u32) -> RasterImage {
    RasterImage::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
        let n = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503)) >> 24;
        Rgba([(x % 256) as u8, (y % 256) as u8, n as u8, 255])
    }))
    .expect("bench image")
}

pub fn compose_benchmark(c: &mut Criterion) {
    let src = photo_like(2000, 1500);
    c.bench_function("compose 2000x1500 -> 1080x1080 contain", |b| {
        b.iter(|| {
            compose(
                black_box(&src),
                1080,
                1080,
                FitMode::Contain,
                &Background::white(),
                &ObjectTransform::default(),
            )
        })
    });
}

pub fn collage_benchmark(c: &mut Criterion) {
    let layout = LayoutTemplate::FourGrid.layout(1200, 1080).expect("layout");
    let mut bindings = CellBindings::new();
    for i in 1..=4 {
        let id = format!("cell-{i}");
        let mut cell = CellImage::new(id.clone(), photo_like(1600, 1200));
        cell.scale = 1.0 + f64::from(i) * 0.25;
        bindings.insert(id, cell);
    }
    c.bench_function("collage four-grid 1200x1080", |b| {
        b.iter(|| render_collage(black_box(&layout), black_box(&bindings), OutputFormat::Jpeg))
    });
}

pub fn budget_export_benchmark(c: &mut Criterion) {
    let src = photo_like(1080, 1080);
    let config = EncoderConfig::default();
    let settings = ExportSettings::jpeg(0.9).with_max_size_kb(150);
    let mut group = c.benchmark_group("export");
    group.sample_size(10);
    group.bench_function("jpeg 1080x1080 under 150KB", |b| {
        b.iter_batched(
            || src.clone(),
            |img| export(&img, &settings, &config),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, compose_benchmark, collage_benchmark, budget_export_benchmark);
criterion_main!(benches);
