//! Benchmarks for table waveshaping.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use grainfield::dsp::distortion::Waveshaper;

use crate::BLOCK_SIZES;

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");
    let shaper = Waveshaper::default();

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("cosine_curve", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                shaper.process(black_box(&mut buffer));
            })
        });

        // driven hard, most samples land in the saturated region
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("saturating", size), &size, |b, _| {
            b.iter(|| {
                for (out, &x) in buffer.iter_mut().zip(&input) {
                    *out = x * 25.0;
                }
                shaper.process(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
