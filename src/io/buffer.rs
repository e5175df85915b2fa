//! Decoded PCM buffers.

use std::sync::Arc;

/// A fully decoded sound, ready to play.
///
/// Channels are stored de-interleaved. Grains and sources read the mono
/// mixdown, computed once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
    mono: Vec<f32>,
}

/// Buffers are shared between the player, triggers and the loader thread.
pub type SharedBuffer = Arc<AudioBuffer>;

impl AudioBuffer {
    /// Build from de-interleaved channels. Shorter channels are padded with
    /// silence to the longest one.
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        for channel in channels.iter_mut() {
            channel.resize(frames, 0.0);
        }

        let mono = match channels.len() {
            0 => Vec::new(),
            1 => channels[0].clone(),
            n => {
                let scale = 1.0 / n as f32;
                (0..frames)
                    .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() * scale)
                    .collect()
            }
        };

        Self {
            sample_rate: sample_rate.max(1),
            channels,
            mono,
        }
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate)
    }

    /// De-interleave `samples` into `channel_count` channels.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        let channel_count = channel_count.max(1);
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn mono(&self) -> &[f32] {
        &self.mono
    }

    pub fn frames(&self) -> usize {
        self.mono.len()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.mono.is_empty()
    }

    pub fn shared(self) -> SharedBuffer {
        Arc::new(self)
    }
}
