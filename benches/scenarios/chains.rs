//! Benchmarks for the installation chains, rendered through the engine.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use grainfield::{
    graph::{GranularAudioPlayer, NodeHandle, PlayerOptions},
    io::AudioBuffer,
    runtime::{PlayerChain, ThingChain},
    Engine, EngineConfig,
};

use crate::BLOCK_SIZES;

fn loaded_engine(build: impl FnOnce(&mut Engine) -> NodeHandle<GranularAudioPlayer>) -> Engine {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    let player = build(&mut engine);
    let buffer = AudioBuffer::from_mono(
        (0..96_000).map(|i| (i as f32 * 0.01).sin()).collect(),
        48_000,
    )
    .shared();
    engine
        .with_node(player, |player, ctx| {
            player.set_buffer(buffer);
            player.start(ctx.scheduler);
        })
        .unwrap();
    engine
}

pub fn bench_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chains");
    let options = PlayerOptions {
        seed: Some(1),
        ..PlayerOptions::default()
    };

    for &size in BLOCK_SIZES {
        let mut output = vec![0.0f32; size];

        // player → {wet → delay, dry} → mix
        let mut engine = loaded_engine(|engine| {
            ThingChain::build(engine, options, true).unwrap().player
        });
        group.bench_with_input(BenchmarkId::new("thing", size), &size, |b, _| {
            b.iter(|| engine.render_block(black_box(&mut output)))
        });

        // player → input bus → overdrive → {delay, master}
        let mut engine = loaded_engine(|engine| PlayerChain::build(engine, options).unwrap().player);
        group.bench_with_input(BenchmarkId::new("player_bench", size), &size, |b, _| {
            b.iter(|| engine.render_block(black_box(&mut output)))
        });
    }

    group.finish();
}
