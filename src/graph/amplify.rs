use crate::{
    dsp::amplify::multiply_in_place,
    graph::{
        node::{impl_as_any, RenderCtx, SignalNode},
        param::AudioParam,
    },
};

/// Plain gain stage: `output = input × gain`.
///
/// Used for the dry and wet sends and for per-trigger levels.
pub struct Gain {
    gain: AudioParam,
}

impl Gain {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AudioParam::unbounded(gain),
        }
    }

    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut AudioParam {
        &mut self.gain
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SignalNode for Gain {
    fn process(&mut self, input: &[f32], output: &mut [f32], ctx: &RenderCtx) {
        output.copy_from_slice(input);
        let gain = self.gain.render(ctx.time, output.len(), ctx.sample_rate);
        multiply_in_place(output, gain);
    }

    impl_as_any!();
}
