//! Audio output and the control loop.

use std::io::BufRead;

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, warn};

use grainfield::{
    graph::PlayerOptions,
    io::wav::load_wav,
    runtime::{Thing, ThingMessage, ThingOptions},
    EngineConfig, MAX_BLOCK_SIZE,
};

use super::{input, Args};

pub fn run(args: &Args, mut config: EngineConfig) -> EyreResult<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let output_config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    // the device decides rate and layout
    config.sample_rate = output_config.sample_rate().0 as f32;
    config.channels = output_config.channels() as usize;
    let channels = config.channels;
    info!(
        device = %device.name().unwrap_or_default(),
        sample_rate = config.sample_rate,
        channels,
        "opening output"
    );

    let options = ThingOptions {
        player: PlayerOptions {
            seed: args.seed,
            ..PlayerOptions::default()
        },
        apply_fx: args.apply_fx,
    };
    let (mut thing, mut handle) = Thing::new(config, options)?;

    if let Some(path) = &args.soundfile {
        let buffer = load_wav(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?
            .shared();
        thing.handle(ThingMessage::Soundfile {
            buffer,
            play_on_load: args.start,
        })?;
    }

    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
    let stream = device.build_output_stream(
        &output_config.into(),
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);
                let block = &mut render_buf[..frames];
                thing.render_block(block);

                // mono to all channels
                let out_off = frames_written * channels;
                for (i, &s) in block.iter().enumerate() {
                    for ch in 0..channels {
                        data[out_off + i * channels + ch] = s;
                    }
                }

                frames_written += frames;
            }
        },
        |err| error!(%err, "audio stream error"),
        None,
    )?;

    stream.play()?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.wrap_err("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match input::parse_line(&line, &args.root) {
            Ok(messages) => {
                for message in messages {
                    if let Err(err) = handle.send(message) {
                        warn!(%err, "control message dropped");
                    }
                }
            }
            Err(err) => warn!(error = %err, "ignoring control line"),
        }
    }

    info!("stdin closed, playing on");
    loop {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
}
