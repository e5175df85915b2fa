use crate::{
    control::{router::DispatchTable, Controllable, ParamSpec, ParamTable, Setter},
    dsp::amplify::multiply_in_place,
    graph::{
        node::{impl_as_any, RenderCtx, SignalNode},
        param::{AudioParam, DecibelParam, ParameterChannel, MUTE_TIME_CONSTANT},
    },
};

#[derive(Debug, Clone, Copy)]
pub struct BusOptions {
    pub volume_db: f32,
    pub mute: bool,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            volume_db: 0.0,
            mute: false,
        }
    }
}

/// Volume and mute stage: `input → volume → mute → output`.
///
/// The mute gain is never stepped after construction. `set_mute` ramps it
/// toward 0 or 1 with `MUTE_TIME_CONSTANT` so toggling does not click.
pub struct AudioBus {
    volume: DecibelParam,
    mute_gain: AudioParam,
    mute: bool,
}

impl AudioBus {
    pub fn new(options: BusOptions) -> Self {
        Self {
            volume: DecibelParam::new(options.volume_db),
            mute_gain: AudioParam::new(if options.mute { 0.0 } else { 1.0 }, 0.0, 1.0),
            mute: options.mute,
        }
    }

    /// Volume channel, in dB.
    pub fn volume(&mut self) -> &mut DecibelParam {
        &mut self.volume
    }

    /// The linear gain behind the volume.
    pub fn gain(&self) -> &AudioParam {
        self.volume.gain()
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    pub fn set_mute(&mut self, mute: bool, now: f64) {
        self.mute = mute;
        let target = if mute { 0.0 } else { 1.0 };
        self.mute_gain
            .set_target_at_time(target, now, MUTE_TIME_CONSTANT);
    }

    pub fn mute_gain(&self) -> &AudioParam {
        &self.mute_gain
    }

    fn volume_channel(bus: &mut AudioBus) -> Option<&mut dyn ParameterChannel> {
        Some(&mut bus.volume)
    }
}

impl Default for AudioBus {
    fn default() -> Self {
        Self::new(BusOptions::default())
    }
}

impl SignalNode for AudioBus {
    fn process(&mut self, input: &[f32], output: &mut [f32], ctx: &RenderCtx) {
        let frames = output.len();
        output.copy_from_slice(input);

        let volume = self.volume.render(ctx.time, frames, ctx.sample_rate);
        multiply_in_place(output, volume);

        let mute = self.mute_gain.render(ctx.time, frames, ctx.sample_rate);
        multiply_in_place(output, mute);
    }

    impl_as_any!();
}

impl Controllable for AudioBus {
    const PARAMS: ParamTable = &[
        ("mute", ParamSpec::boolean(false)),
        ("volume", ParamSpec::float(-80.0, 12.0, 0.0)),
    ];
    const DISPATCH: DispatchTable<Self> = &[
        ("mute", Setter::Bool(AudioBus::set_mute)),
        ("volume", Setter::Channel(AudioBus::volume_channel)),
    ];
}
