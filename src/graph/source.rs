use crate::{
    dsp::playback::BufferReader,
    graph::node::{impl_as_any, RenderCtx, SignalNode},
    io::SharedBuffer,
};

/// Plays a buffer once (or looped) between exact start and stop times.
///
/// A source starting in the past plays from the first sample it is
/// rendered, at the requested offset. Once it has played out (or passed
/// its stop time) it reports `finished()` and the graph drops it.
pub struct BufferSource {
    buffer: SharedBuffer,
    looping: bool,
    start: Option<(f64, f64)>, // (when, offset)
    stop_time: f64,
    reader: Option<BufferReader>,
    done: bool,
}

impl BufferSource {
    pub fn new(buffer: SharedBuffer) -> Self {
        Self {
            buffer,
            looping: false,
            start: None,
            stop_time: f64::INFINITY,
            reader: None,
            done: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Start at logical time `when`, `offset` seconds into the buffer.
    pub fn start(&mut self, when: f64, offset: f64) {
        if self.start.is_none() {
            self.start = Some((when, offset.max(0.0)));
        }
    }

    pub fn stop(&mut self, when: f64) {
        self.stop_time = when;
        if self.start.is_none() {
            self.done = true;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.reader.is_some() && !self.done
    }
}

impl SignalNode for BufferSource {
    fn process(&mut self, _input: &[f32], output: &mut [f32], ctx: &RenderCtx) {
        output.fill(0.0);
        let Some((when, offset)) = self.start else {
            return;
        };
        if self.done {
            return;
        }

        for (i, sample) in output.iter_mut().enumerate() {
            let t = ctx.time_at(i);
            if t >= self.stop_time {
                self.done = true;
                return;
            }
            if t < when {
                continue;
            }

            let buffer = &self.buffer;
            let looping = self.looping;
            let reader = self
                .reader
                .get_or_insert_with(|| BufferReader::new(offset, buffer, looping));
            if reader.exhausted(buffer) {
                self.done = true;
                return;
            }
            *sample = reader.next_sample(buffer, ctx.sample_rate);
        }
    }

    fn finished(&self) -> bool {
        self.done
    }

    impl_as_any!();
}
