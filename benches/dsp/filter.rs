//! Benchmarks for the state-variable low-pass.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use grainfield::dsp::filter::SVFilter;

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // sawtooth-like ramp
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let mut output = vec![0.0f32; size];

        let mut filter = SVFilter::lowpass();
        group.bench_with_input(BenchmarkId::new("lowpass_fixed", size), &size, |b, _| {
            b.iter(|| {
                for (out, &x) in output.iter_mut().zip(&input) {
                    *out = filter.process(black_box(x), 12_000.0, SAMPLE_RATE);
                }
            })
        });

        // cutoff moving every sample defeats the coefficient cache
        let mut filter = SVFilter::lowpass();
        group.bench_with_input(BenchmarkId::new("lowpass_swept", size), &size, |b, _| {
            b.iter(|| {
                for (i, (out, &x)) in output.iter_mut().zip(&input).enumerate() {
                    let cutoff = 1_000.0 + i as f32 * 10.0;
                    *out = filter.process(black_box(x), cutoff, SAMPLE_RATE);
                }
            })
        });
    }

    group.finish();
}
