use crate::{
    control::{router::DispatchTable, Controllable, ParamSpec, ParamTable, Setter},
    dsp::{amplify::multiply_in_place, distortion::Waveshaper},
    graph::{
        node::{impl_as_any, RenderCtx, SignalNode},
        param::{CompensatedParam, ParameterChannel},
    },
};

pub const MIN_DRIVE: f32 = 0.1;
pub const MAX_DRIVE: f32 = 25.0;

/// Waveshaping overdrive with automatic level compensation.
///
/// `input → pre-gain (v) → waveshaper → post-gain (1/v) → output`
///
/// The drive amount `v` pushes the signal into the curve's knee and the
/// post-gain takes the same amount back out, so turning up the drive
/// changes the colour of the sound more than its level.
pub struct Overdrive {
    shaper: Waveshaper,
    gain: CompensatedParam,
}

impl Overdrive {
    pub fn new() -> Self {
        Self::with_curve(Waveshaper::default())
    }

    pub fn with_curve(shaper: Waveshaper) -> Self {
        Self {
            shaper,
            gain: CompensatedParam::new(1.0, MIN_DRIVE, MAX_DRIVE),
        }
    }

    /// Drive amount, driving both pre and post gains.
    pub fn gain(&mut self) -> &mut CompensatedParam {
        &mut self.gain
    }

    pub fn compensation(&self) -> &CompensatedParam {
        &self.gain
    }

    fn gain_channel(node: &mut Overdrive) -> Option<&mut dyn ParameterChannel> {
        Some(&mut node.gain)
    }
}

impl Default for Overdrive {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalNode for Overdrive {
    fn process(&mut self, input: &[f32], output: &mut [f32], ctx: &RenderCtx) {
        output.copy_from_slice(input);
        let (pre, post) = self.gain.render(ctx.time, output.len(), ctx.sample_rate);

        multiply_in_place(output, pre);
        self.shaper.process(output);
        multiply_in_place(output, post);
    }

    impl_as_any!();
}

impl Controllable for Overdrive {
    const PARAMS: ParamTable = &[(
        "gain",
        ParamSpec::float(MIN_DRIVE as f64, MAX_DRIVE as f64, 1.0),
    )];
    const DISPATCH: DispatchTable<Self> = &[("gain", Setter::Channel(Overdrive::gain_channel))];
}
