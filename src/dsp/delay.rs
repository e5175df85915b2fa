/// Circular delay line sized for a maximum delay time.
///
/// Reads are fractional (linear interpolation) so a ramped delay time does not
/// zipper. A read of `d` samples returns the sample written `d` writes ago, so
/// the shortest usable delay is one sample.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Allocate enough memory for `max_delay_time` seconds at `sample_rate`.
    pub fn new(max_delay_time: f64, sample_rate: f32) -> Self {
        let capacity = (max_delay_time.max(0.0) * sample_rate as f64).ceil() as usize + 2;
        Self::with_capacity(capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
        }
    }

    /// Longest delay this line can produce, in samples.
    pub fn max_delay_samples(&self) -> f32 {
        (self.buffer.len() - 1) as f32
    }

    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read `delay_samples` behind the write head, clamped to `[1, max]`.
    pub fn read_interpolated(&self, delay_samples: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay_samples.clamp(1.0, self.max_delay_samples());

        let whole = delay.floor();
        let frac = delay - whole;
        let whole = whole as usize;

        // newest sample sits one slot behind the write head
        let a = (self.write_pos + len - whole) % len;
        let b = (a + len - 1) % len;

        self.buffer[a] * (1.0 - frac) + self.buffer[b] * frac
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
