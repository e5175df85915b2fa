// Decoded buffers, file decoding and host block containers.

pub mod buffer;
pub mod wav;

pub use buffer::{AudioBuffer, SharedBuffer};

/// One rendered block, one buffer per output channel.
#[derive(Debug, Default)]
pub struct AudioOutput {
    pub buffers: Vec<Vec<f32>>,
}

impl AudioOutput {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            buffers: vec![vec![0.0; frames]; channels],
        }
    }

    pub fn frames(&self) -> usize {
        self.buffers.first().map_or(0, Vec::len)
    }
}
