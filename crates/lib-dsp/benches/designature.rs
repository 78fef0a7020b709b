//! Trace processing benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lib_dsp::{ConvolutionEngine, DesignOptions, FilterDesigner, ResampleConfig, ResampleDescriptor};
use lib_types::trace::TraceLayout;
use lib_types::units::Milliseconds;
use lib_types::wavelet::Wavelet;

fn signature(dt: Milliseconds) -> Wavelet {
    let samples = (0..64)
        .map(|i| {
            let t = i as f32 * 0.1;
            (-t).exp() * (3.0 * t).cos()
        })
        .collect();
    Wavelet::new(samples, dt, Milliseconds::ZERO)
}

fn trace(n: usize) -> Vec<f32> {
    (0..n).map(|i| (i as f32 * 0.013).sin() + 0.1 * (i as f32 * 0.41).cos()).collect()
}

fn bench_designature(c: &mut Criterion) {
    let mut group = c.benchmark_group("designature");
    let dt = Milliseconds(2.0);

    for num_samples in [1000, 2001, 4096].iter() {
        let layout = TraceLayout::new(*num_samples, dt);
        let wavelet = signature(dt);

        group.bench_with_input(BenchmarkId::new("design", num_samples), &layout, |b, l| {
            b.iter(|| {
                FilterDesigner::new(*l, black_box(&wavelet), DesignOptions::default())
                    .and_then(|d| d.build())
            });
        });

        let filter = FilterDesigner::new(layout, &wavelet, DesignOptions::default())
            .unwrap()
            .build()
            .unwrap();
        let input = trace(*num_samples);
        group.bench_with_input(BenchmarkId::new("apply", num_samples), &input, |b, t| {
            b.iter(|| {
                let mut buffer = t.clone();
                filter.apply(black_box(&mut buffer))
            });
        });
    }

    group.finish();
}

fn bench_resample_and_convolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace_ops");
    let layout = TraceLayout::new(4000, Milliseconds(1.0));
    let input = trace(layout.num_samples);

    let down = ResampleDescriptor::new(ResampleConfig::new(layout, Milliseconds(4.0))).unwrap();
    group.bench_function("downsample_4x", |b| b.iter(|| down.resample_vec(black_box(&input))));

    let up = ResampleDescriptor::new(ResampleConfig::new(layout, Milliseconds(0.5))).unwrap();
    group.bench_function("upsample_2x", |b| b.iter(|| up.resample_vec(black_box(&input))));

    for wavelet_len in [16, 64, 256].iter() {
        let wavelet: Vec<f32> = (0..*wavelet_len).map(|i| (-(i as f32) * 0.05).exp()).collect();
        let engine = ConvolutionEngine::new(layout, &wavelet, 0).unwrap();
        group.bench_with_input(BenchmarkId::new("convolve", wavelet_len), &input, |b, t| {
            let mut out = vec![0.0; t.len()];
            b.iter(|| engine.convolve(black_box(t), &mut out));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_designature, bench_resample_and_convolve);
criterion_main!(benches);
