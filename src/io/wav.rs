//! WAV decoding into [`AudioBuffer`].
//!
//! Decoding happens off the audio thread. The render path only ever sees
//! the finished buffer.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::buffer::AudioBuffer;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to decode WAV: {0}")]
    Wav(#[from] hound::Error),

    #[error("Sound file contains no samples")]
    Empty,

    #[error("Unsupported sample format: {bits}-bit {format:?}")]
    UnsupportedFormat {
        format: hound::SampleFormat,
        bits: u16,
    },
}

pub fn load_wav(path: impl AsRef<Path>) -> Result<AudioBuffer, LoadError> {
    let path = path.as_ref();
    let reader = hound::WavReader::open(path)?;
    let buffer = decode(reader)?;
    debug!(
        path = %path.display(),
        channels = buffer.channel_count(),
        sample_rate = buffer.sample_rate(),
        seconds = buffer.duration(),
        "decoded sound file"
    );
    Ok(buffer)
}

/// Decode an in-memory WAV file.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer, LoadError> {
    let reader = hound::WavReader::new(std::io::Cursor::new(bytes))?;
    decode(reader)
}

fn decode<R: std::io::Read>(reader: hound::WavReader<R>) -> Result<AudioBuffer, LoadError> {
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()?,
        (hound::SampleFormat::Int, bits @ 8..=32) => {
            let scale = 1.0 / (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
        (format, bits) => return Err(LoadError::UnsupportedFormat { format, bits }),
    };

    if samples.is_empty() {
        return Err(LoadError::Empty);
    }

    Ok(AudioBuffer::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    ))
}
