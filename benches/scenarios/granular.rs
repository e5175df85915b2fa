//! Benchmarks for granular playback.
//!
//! Short periods with long durations pile up overlapping grains, the
//! heaviest load a player puts on the render thread.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use grainfield::{
    config::SchedulerConfig,
    engine::{clock::ManualClock, scheduler::LogicalScheduler},
    graph::{GranularAudioPlayer, PlayerError, PlayerOptions, RenderCtx, SignalNode},
    io::AudioBuffer,
};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_granular(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/granular");

    let frames = 2 * SAMPLE_RATE as usize;
    let buffer = AudioBuffer::from_mono(
        (0..frames).map(|i| (i as f32 * 0.01).sin()).collect(),
        SAMPLE_RATE as u32,
    )
    .shared();

    // (label, period, duration): overlap = duration / period grains
    let settings: &[(&str, f64, f64)] = &[
        ("sparse", 0.1, 0.05),
        ("default", 0.1, 0.25),
        ("dense", 0.01, 0.25),
    ];

    for &size in BLOCK_SIZES {
        let block = size as f64 / SAMPLE_RATE as f64;

        for &(label, period, duration) in settings {
            let mut scheduler = LogicalScheduler::new(ManualClock::new(), &SchedulerConfig::default());
            let mut player = GranularAudioPlayer::new(
                &mut scheduler,
                PlayerOptions {
                    period,
                    duration,
                    seed: Some(1),
                },
            );
            player.set_buffer(buffer.clone());
            player.start(&mut scheduler);

            let mut output = vec![0.0f32; size];
            let mut time = 0.0;
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, _| {
                b.iter(|| {
                    scheduler.run_until(time + block + 0.05, |_, t| {
                        Ok::<_, PlayerError>(player.render(t)?)
                    });
                    player.process(&[], black_box(&mut output), &RenderCtx::new(SAMPLE_RATE, time));
                    time += block;
                })
            });
        }
    }

    group.finish();
}
