/*
Buffer Playback
===============

Grains and one-shot sources read a decoded buffer by TIME, not by sample
index: a grain that starts at 0.8 s into the file reads frame 0.8 × rate.
The read head usually lands between two frames, so the reader
interpolates linearly:

    frame = offset × buffer_rate
    out   = s[i] + (s[i + 1] - s[i]) × frac

The head advances by buffer_rate / output_rate per output sample, which
also resamples a 44.1 kHz file on a 48 kHz output.

Looping wraps the head back to the start of the buffer (both the head and
the interpolation neighbour), so a grain crossing the end of the file reads
on from the beginning without a click.
*/

use crate::io::buffer::AudioBuffer;

#[derive(Debug, Clone)]
pub struct BufferReader {
    /// Read position in buffer frames.
    head: f64,
    looping: bool,
}

impl BufferReader {
    pub fn new(offset_seconds: f64, buffer: &AudioBuffer, looping: bool) -> Self {
        Self {
            head: offset_seconds.max(0.0) * buffer.sample_rate() as f64,
            looping,
        }
    }

    pub fn position(&self, buffer: &AudioBuffer) -> f64 {
        self.head / buffer.sample_rate() as f64
    }

    /// True once a non-looping reader has run off the end.
    pub fn exhausted(&self, buffer: &AudioBuffer) -> bool {
        !self.looping && self.head >= buffer.frames() as f64
    }

    /// Read one sample at the output rate and advance.
    #[inline]
    pub fn next_sample(&mut self, buffer: &AudioBuffer, output_rate: f32) -> f32 {
        let samples = buffer.mono();
        let len = samples.len();
        if len == 0 {
            return 0.0;
        }

        let len_f = len as f64;
        if self.looping && self.head >= len_f {
            self.head %= len_f;
        }
        if self.head >= len_f {
            return 0.0;
        }

        let index = self.head.floor();
        let frac = (self.head - index) as f32;
        let i = index as usize;
        let next = if i + 1 < len {
            samples[i + 1]
        } else if self.looping {
            samples[0]
        } else {
            0.0
        };

        self.head += buffer.sample_rate() as f64 / output_rate as f64;
        samples[i] + (next - samples[i]) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(len: usize, rate: u32) -> AudioBuffer {
        AudioBuffer::from_mono((0..len).map(|i| i as f32).collect(), rate)
    }

    #[test]
    fn reads_from_time_offset() {
        let buffer = ramp(100, 10);
        let mut reader = BufferReader::new(2.5, &buffer, false);
        assert_relative_eq!(reader.next_sample(&buffer, 10.0), 25.0);
        assert_relative_eq!(reader.next_sample(&buffer, 10.0), 26.0);
    }

    #[test]
    fn resamples_to_output_rate() {
        let buffer = ramp(100, 10);
        let mut reader = BufferReader::new(0.0, &buffer, false);
        let out: Vec<f32> = (0..4).map(|_| reader.next_sample(&buffer, 20.0)).collect();
        for (sample, expected) in out.iter().zip([0.0, 0.5, 1.0, 1.5]) {
            assert_relative_eq!(*sample, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn looping_wraps_to_start() {
        let buffer = ramp(4, 4);
        let mut reader = BufferReader::new(0.75, &buffer, true);
        assert_relative_eq!(reader.next_sample(&buffer, 4.0), 3.0);
        assert_relative_eq!(reader.next_sample(&buffer, 4.0), 0.0);
        assert!(!reader.exhausted(&buffer));
    }

    #[test]
    fn one_shot_goes_silent_at_end() {
        let buffer = ramp(4, 4);
        let mut reader = BufferReader::new(0.75, &buffer, false);
        reader.next_sample(&buffer, 4.0);
        assert_eq!(reader.next_sample(&buffer, 4.0), 0.0);
        assert!(reader.exhausted(&buffer));
    }
}
