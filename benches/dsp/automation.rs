//! Benchmarks for automation timeline evaluation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use grainfield::dsp::Automation;

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_automation(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/automation");

    for &size in BLOCK_SIZES {
        let mut out = vec![0.0f32; size];

        let fixed = Automation::new(0.5);
        group.bench_with_input(BenchmarkId::new("static", size), &size, |b, _| {
            b.iter(|| fixed.fill(black_box(&mut out), 0.0, SAMPLE_RATE))
        });

        // a grain envelope: two linear ramps
        let mut envelope = Automation::new(0.0);
        envelope.set_value_at_time(0.0, 0.0);
        envelope.linear_ramp_to_value_at_time(1.0, 0.125);
        envelope.linear_ramp_to_value_at_time(0.0, 0.25);
        group.bench_with_input(BenchmarkId::new("grain_envelope", size), &size, |b, _| {
            b.iter(|| envelope.fill(black_box(&mut out), black_box(0.1), SAMPLE_RATE))
        });

        // live parameter smoothing
        let mut smoothed = Automation::new(0.0);
        smoothed.set_target_at_time(1.0, 0.0, 0.01);
        group.bench_with_input(BenchmarkId::new("set_target", size), &size, |b, _| {
            b.iter(|| smoothed.fill(black_box(&mut out), black_box(0.005), SAMPLE_RATE))
        });

        let mut exponential = Automation::new(0.001);
        exponential.set_value_at_time(0.001, 0.0);
        exponential.exponential_ramp_to_value_at_time(1.0, 0.5);
        group.bench_with_input(BenchmarkId::new("exponential_ramp", size), &size, |b, _| {
            b.iter(|| exponential.fill(black_box(&mut out), black_box(0.2), SAMPLE_RATE))
        });
    }

    group.finish();
}
