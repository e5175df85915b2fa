//! Granular buffer player driven by the logical-time scheduler.

/*
Granular Playback
=================

The player cuts its buffer into short, overlapping, enveloped grains and
lays them end to end in time:

    buffer  |=====================================|   B seconds
             ^pos      ^pos+p    ^pos+2p
    grains  /\         /\        /\
           /  \       /  \      /  \
    time  t   t+d    t+p         t+2p ...

Each scheduler tick (one `render` call) emits ONE grain and returns the
time of the next tick, `t + period`.


One Tick
--------

1. now = t. When the period is in the audible range (< 20 ms, i.e. a
   repetition rate above 50 Hz), a random jitter of up to 1 ms is added to
   decorrelate the onsets. Strictly periodic onsets at such rates would be
   heard as a pitched buzz. Slower rates stay exact.
2. The grain duration is clamped so the grain never reads past the end of
   the buffer:

       duration = min(duration, B - position)

3. A triangular envelope over [now, now + duration]:

       0 ──→ 1 at the midpoint ──→ 0

4. A looping reader started at `position`.
5. The position advances and wraps, so grains keep tiling the buffer:

       position = (position + period) mod (B - duration)

   (0 when the grain is as long as the buffer.)
6. Return t + period. The next time comes from the scheduled time `t`,
   never from the jittered `now`, so the jitter does not accumulate.


Start / Stop
------------

The render callback is registered once, parked at t = ∞. `start` moves it
to the current time, `stop` parks it again. Grains already emitted are not
cut off: they play out.

A buffer set while stopped takes effect at once. A buffer set while
running is armed and swapped in at the next `start`, so the tiling of a
running player never changes under it.
*/

use rand::{rngs::SmallRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    control::{
        router::{ControlCtx, DispatchTable},
        Controllable, ParamSpec, ParamTable, Setter,
    },
    dsp::{automation::Automation, playback::BufferReader},
    engine::scheduler::{CallbackId, Scheduler},
    graph::node::{impl_as_any, RenderCtx, SignalNode},
    io::SharedBuffer,
};

/// Periods below this get onset jitter.
pub const JITTER_PERIOD_THRESHOLD: f64 = 0.02;
/// Upper bound of the onset jitter, in seconds.
pub const MAX_JITTER: f64 = 0.001;
/// Floor for period and duration set through the direct API.
pub const MIN_GRAIN_TIME: f64 = 0.001;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error("No buffer to play")]
    NoBuffer,
}

/// One emitted grain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grain {
    pub start_time: f64,
    pub duration: f64,
    pub source_offset: f64,
}

impl Grain {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

struct GrainVoice {
    grain: Grain,
    envelope: Automation,
    reader: BufferReader,
    buffer: SharedBuffer,
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerOptions {
    pub period: f64,
    pub duration: f64,
    /// Seed for the onset jitter. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            period: 0.1,
            duration: 0.25,
            seed: None,
        }
    }
}

pub struct GranularAudioPlayer {
    callback: CallbackId,
    buffer: Option<SharedBuffer>,
    armed: Option<SharedBuffer>,
    position: f64,
    period: f64,
    duration: f64,
    running: bool,
    rng: SmallRng,
    voices: Vec<GrainVoice>,
    grains_emitted: u64,
}

impl GranularAudioPlayer {
    pub fn new(scheduler: &mut dyn Scheduler, options: PlayerOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        Self {
            callback: scheduler.add(f64::INFINITY),
            buffer: None,
            armed: None,
            position: 0.0,
            period: options.period.max(MIN_GRAIN_TIME),
            duration: options.duration.max(MIN_GRAIN_TIME),
            running: false,
            rng,
            voices: Vec::with_capacity(32),
            grains_emitted: 0,
        }
    }

    /// The scheduler callback driving `render`.
    pub fn callback_id(&self) -> CallbackId {
        self.callback
    }

    pub fn buffer(&self) -> Option<&SharedBuffer> {
        self.buffer.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some() || self.armed.is_some()
    }

    pub fn set_buffer(&mut self, buffer: SharedBuffer) {
        if self.running {
            debug!(seconds = buffer.duration(), "buffer armed until next start");
            self.armed = Some(buffer);
        } else {
            self.buffer = Some(buffer);
            self.armed = None;
            self.position = 0.0;
        }
    }

    pub fn start(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(buffer) = self.armed.take() {
            self.buffer = Some(buffer);
        }
        if self.buffer.is_none() {
            warn!("cannot start granular player: no buffer set");
            return;
        }

        self.position = 0.0;
        self.running = true;
        scheduler.reset(self.callback, scheduler.current_time());
    }

    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        self.running = false;
        scheduler.reset(self.callback, f64::INFINITY);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn set_period(&mut self, period: f64) {
        self.period = period.max(MIN_GRAIN_TIME);
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(MIN_GRAIN_TIME);
    }

    /// Grains that are scheduled or still sounding.
    pub fn grains(&self) -> impl Iterator<Item = &Grain> {
        self.voices.iter().map(|voice| &voice.grain)
    }

    pub fn grains_emitted(&self) -> u64 {
        self.grains_emitted
    }

    /// Emit one grain for the tick scheduled at `current_time` and return
    /// the time of the next tick.
    pub fn render(&mut self, current_time: f64) -> Result<f64, PlayerError> {
        let buffer = self.buffer.clone().ok_or(PlayerError::NoBuffer)?;
        let buffer_duration = buffer.duration();

        let mut now = current_time;
        if self.period < JITTER_PERIOD_THRESHOLD {
            now += self.rng.gen_range(0.0..MAX_JITTER);
        }

        let duration = self.duration.min(buffer_duration - self.position).max(0.0);

        let mut envelope = Automation::new(0.0);
        envelope.set_value_at_time(0.0, now);
        envelope.linear_ramp_to_value_at_time(1.0, now + duration / 2.0);
        envelope.linear_ramp_to_value_at_time(0.0, now + duration);

        let grain = Grain {
            start_time: now,
            duration,
            source_offset: self.position,
        };
        self.voices.push(GrainVoice {
            grain,
            envelope,
            reader: BufferReader::new(self.position, &buffer, true),
            buffer,
        });
        self.grains_emitted += 1;

        let span = buffer_duration - self.duration;
        self.position = if span > 0.0 {
            (self.position + self.period) % span
        } else {
            0.0
        };

        Ok(current_time + self.period)
    }

    fn start_action(player: &mut Self, ctx: &mut ControlCtx<'_>) {
        player.start(ctx.scheduler);
    }

    fn stop_action(player: &mut Self, ctx: &mut ControlCtx<'_>) {
        player.stop(ctx.scheduler);
    }
}

impl SignalNode for GranularAudioPlayer {
    fn process(&mut self, _input: &[f32], output: &mut [f32], ctx: &RenderCtx) {
        output.fill(0.0);
        let frames = output.len();

        for voice in self.voices.iter_mut() {
            let start = voice.grain.start_time;
            let end = voice.grain.end_time();
            for (i, sample) in output.iter_mut().enumerate() {
                let t = ctx.time_at(i);
                if t < start {
                    continue;
                }
                if t >= end {
                    break;
                }
                let gain = voice.envelope.value_at(t);
                *sample += voice.reader.next_sample(&voice.buffer, ctx.sample_rate) * gain;
            }
        }

        let block_end = ctx.block_end(frames);
        self.voices.retain(|voice| voice.grain.end_time() > block_end);
    }

    impl_as_any!();
}

impl Controllable for GranularAudioPlayer {
    const PARAMS: ParamTable = &[
        ("control", ParamSpec::enumeration(&["start", "stop"], "stop")),
        ("period", ParamSpec::float(0.05, 1.0, 0.1)),
        ("duration", ParamSpec::float(0.01, 1.0, 0.25)),
    ];
    const DISPATCH: DispatchTable<Self> = &[
        (
            "control",
            Setter::Enum(&[
                ("start", GranularAudioPlayer::start_action),
                ("stop", GranularAudioPlayer::stop_action),
            ]),
        ),
        ("period", Setter::Float(GranularAudioPlayer::set_period)),
        ("duration", Setter::Float(GranularAudioPlayer::set_duration)),
    ];
}
