//! Benchmarks for delay line and feedback delay operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use grainfield::{
    dsp::delay::DelayLine,
    graph::{DelayOptions, FeedbackDelay, RenderCtx, SignalNode},
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    // delay times in samples
    let delay_times: &[f32] = &[
        480.0,   // 10ms at 48kHz
        4800.0,  // 100ms at 48kHz
        47999.5, // just under 1 second at 48kHz
    ];

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        for &delay_samples in delay_times {
            let delay_ms = delay_samples / 48.0;

            let mut line = DelayLine::new(1.0, SAMPLE_RATE);
            group.bench_with_input(
                BenchmarkId::new(format!("write_read_{}ms", delay_ms as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let mut sum = 0.0f32;
                        for &x in &input {
                            sum += line.read_interpolated(black_box(delay_samples));
                            line.write(x);
                        }
                        sum
                    })
                },
            );
        }

        // full node: per-sample loop with filter and automation
        let mut delay = FeedbackDelay::new(SAMPLE_RATE, DelayOptions::default());
        let mut output = vec![0.0f32; size];
        let ctx = RenderCtx::new(SAMPLE_RATE, 0.0);
        group.bench_with_input(BenchmarkId::new("feedback_delay", size), &size, |b, _| {
            b.iter(|| delay.process(black_box(&input), black_box(&mut output), &ctx))
        });
    }

    group.finish();
}
