use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use docscan::{order_corners, preprocess, rectify, DocumentScanner, Point2f, PreprocessConfig, ScanConfig};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// Light sheet on a dark table, slightly skewed.
fn synthetic_photo(width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb([30, 30, 35]));
    let w = width as i32;
    let h = height as i32;
    let sheet = [
        Point::new(w / 5, h / 6),
        Point::new(w * 4 / 5, h / 8),
        Point::new(w * 5 / 6, h * 5 / 6),
        Point::new(w / 6, h * 4 / 5),
    ];
    draw_polygon_mut(&mut img, &sheet, Rgb([230, 228, 220]));
    img
}

fn benchmark_full_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_scan");
    group.sample_size(10);

    let scanner = DocumentScanner::new(ScanConfig::default()).expect("default config is valid");
    for (w, h) in [(320u32, 240u32), (640, 480), (1280, 960)] {
        let img = synthetic_photo(w, h);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{w}x{h}")), &img, |b, img| {
            b.iter(|| scanner.scan(black_box(img)).expect("scan failed"));
        });
    }

    group.finish();
}

fn benchmark_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    group.sample_size(20);

    let img = synthetic_photo(640, 480);
    let cfg = PreprocessConfig::default();
    group.bench_function("preprocess", |b| {
        b.iter(|| preprocess(black_box(&img), &cfg));
    });

    let corners = order_corners([
        Point2f::new(128.0, 80.0),
        Point2f::new(512.0, 60.0),
        Point2f::new(533.0, 400.0),
        Point2f::new(106.0, 384.0),
    ]);
    group.bench_function("rectify", |b| {
        b.iter(|| rectify(black_box(&img), &corners).expect("rectify failed"));
    });

    group.finish();
}

criterion_group!(benches, benchmark_full_scan, benchmark_stages);
criterion_main!(benches);
