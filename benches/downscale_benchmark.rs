use boxscale::{downscale, ImageBuffer, ScaleFactor};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn synthetic(width: u32, height: u32) -> ImageBuffer {
    let pixels = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
    ImageBuffer::from_raw(width, height, pixels).expect("dimensions match")
}

fn benchmark_downscale(c: &mut Criterion) {
    let image = synthetic(1920, 1080);
    let mut group = c.benchmark_group("downscale_1080p");

    for factor in [2u32, 4, 8, 16] {
        let factor = ScaleFactor::new(factor).expect("non-zero");
        group.bench_with_input(BenchmarkId::from_parameter(factor), &factor, |b, &f| {
            b.iter(|| downscale(black_box(&image), f).expect("allocation"));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_downscale);
criterion_main!(benches);
