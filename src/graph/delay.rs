use crate::{
    control::{router::DispatchTable, Controllable, ParamSpec, ParamTable, Setter},
    dsp::{delay::DelayLine, filter::SVFilter},
    graph::{
        node::{impl_as_any, RenderCtx, SignalNode},
        param::{AudioParam, ParameterChannel},
    },
};

/*
Feedback Delay
==============

    input ──→ preGain ──→ (+) ──→ delay ──→ lowpass ──┬──→ output
                           ↑                        │
                           └────── feedback ←───────┘

    input ──→ directSound ────────────────────────────→ output   (optional)

Every repeat passes through the tone filter once more, so echoes lose
their highs as they decay. The loop is computed one sample at a time:

    delayed  = delay.read(delayTime)
    filtered = lowpass(delayed)
    delay.write(preGain × x + feedback × filtered)
    y        = filtered + directSound × x

Stability: the low-pass never amplifies (Butterworth, no resonance) and
`feedback` is clamped to [0, 1], so the loop gain stays ≤ 1.

`delayTime` is clamped to [1 sample, maxDelayTime]. The buffer is sized
once at construction for maxDelayTime.
*/

#[derive(Debug, Clone, Copy)]
pub struct DelayOptions {
    pub max_delay_time: f64,
    pub delay_time: f32,
    pub pre_gain: f32,
    pub feedback: f32,
    pub filter_frequency: f32,
    /// Dry level, or `None` for a wet-only delay.
    pub direct_sound: Option<f32>,
}

impl Default for DelayOptions {
    fn default() -> Self {
        Self {
            max_delay_time: 1.0,
            delay_time: 0.1,
            pre_gain: 0.8,
            feedback: 0.8,
            filter_frequency: 12_000.0,
            direct_sound: Some(1.0),
        }
    }
}

pub struct FeedbackDelay {
    line: DelayLine,
    filter: SVFilter,
    max_delay_time: f32,

    pre_gain: AudioParam,
    delay_time: AudioParam,
    feedback: AudioParam,
    filter_frequency: AudioParam,
    direct_sound: Option<AudioParam>,
}

impl FeedbackDelay {
    pub fn new(sample_rate: f32, options: DelayOptions) -> Self {
        let max_delay_time = options.max_delay_time.max(0.0);
        Self {
            line: DelayLine::new(max_delay_time, sample_rate),
            filter: SVFilter::lowpass(),
            max_delay_time: max_delay_time as f32,
            pre_gain: AudioParam::new(options.pre_gain, 0.0, 1.0),
            delay_time: AudioParam::new(options.delay_time, 0.0, max_delay_time as f32),
            feedback: AudioParam::new(options.feedback, 0.0, 1.0),
            filter_frequency: AudioParam::new(options.filter_frequency, 0.0, 20_000.0),
            direct_sound: options
                .direct_sound
                .map(|level| AudioParam::new(level, 0.0, 1.0)),
        }
    }

    pub fn max_delay_time(&self) -> f32 {
        self.max_delay_time
    }

    pub fn pre_gain(&mut self) -> &mut AudioParam {
        &mut self.pre_gain
    }

    pub fn delay_time(&mut self) -> &mut AudioParam {
        &mut self.delay_time
    }

    pub fn feedback(&mut self) -> &mut AudioParam {
        &mut self.feedback
    }

    pub fn filter_frequency(&mut self) -> &mut AudioParam {
        &mut self.filter_frequency
    }

    pub fn direct_sound(&mut self) -> Option<&mut AudioParam> {
        self.direct_sound.as_mut()
    }

    pub fn reset(&mut self) {
        self.line.reset();
        self.filter.reset();
    }

    fn direct_channel(node: &mut Self) -> Option<&mut dyn ParameterChannel> {
        node.direct_sound
            .as_mut()
            .map(|param| param as &mut dyn ParameterChannel)
    }

    fn pre_gain_channel(node: &mut Self) -> Option<&mut dyn ParameterChannel> {
        Some(&mut node.pre_gain)
    }

    fn delay_time_channel(node: &mut Self) -> Option<&mut dyn ParameterChannel> {
        Some(&mut node.delay_time)
    }

    fn feedback_channel(node: &mut Self) -> Option<&mut dyn ParameterChannel> {
        Some(&mut node.feedback)
    }

    fn filter_frequency_channel(node: &mut Self) -> Option<&mut dyn ParameterChannel> {
        Some(&mut node.filter_frequency)
    }
}

impl SignalNode for FeedbackDelay {
    fn process(&mut self, input: &[f32], output: &mut [f32], ctx: &RenderCtx) {
        let frames = output.len();
        let (time, sr) = (ctx.time, ctx.sample_rate);

        let pre = self.pre_gain.render(time, frames, sr);
        let delay = self.delay_time.render(time, frames, sr);
        let feedback = self.feedback.render(time, frames, sr);
        let cutoff = self.filter_frequency.render(time, frames, sr);
        let direct = self
            .direct_sound
            .as_mut()
            .map(|param| param.render(time, frames, sr));

        for i in 0..frames {
            let x = input[i];

            let delayed = self.line.read_interpolated(delay[i] * sr);
            let filtered = self.filter.process(delayed, cutoff[i], sr);
            self.line.write(pre[i] * x + feedback[i] * filtered);

            output[i] = match direct {
                Some(direct) => filtered + direct[i] * x,
                None => filtered,
            };
        }
    }

    impl_as_any!();
}

impl Controllable for FeedbackDelay {
    const PARAMS: ParamTable = &[
        ("directSound", ParamSpec::float(0.0, 1.0, 1.0)),
        ("preGain", ParamSpec::float(0.0, 1.0, 0.8)),
        ("delayTime", ParamSpec::float(0.0, 1.0, 0.1)),
        ("feedback", ParamSpec::float(0.0, 1.0, 0.8)),
        ("filterFrequency", ParamSpec::float(0.0, 20_000.0, 12_000.0)),
    ];
    const DISPATCH: DispatchTable<Self> = &[
        ("directSound", Setter::Channel(FeedbackDelay::direct_channel)),
        ("preGain", Setter::Channel(FeedbackDelay::pre_gain_channel)),
        ("delayTime", Setter::Channel(FeedbackDelay::delay_time_channel)),
        ("feedback", Setter::Channel(FeedbackDelay::feedback_channel)),
        (
            "filterFrequency",
            Setter::Channel(FeedbackDelay::filter_frequency_channel),
        ),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn wet_only(feedback: f32) -> FeedbackDelay {
        FeedbackDelay::new(
            SAMPLE_RATE,
            DelayOptions {
                delay_time: 0.01,
                pre_gain: 1.0,
                feedback,
                filter_frequency: 20_000.0,
                direct_sound: None,
                ..DelayOptions::default()
            },
        )
    }

    fn impulse_response(delay: &mut FeedbackDelay, frames: usize) -> Vec<f32> {
        let mut input = vec![0.0; frames];
        input[0] = 1.0;
        let mut out = vec![0.0; frames];
        delay.process(&input, &mut out, &RenderCtx::new(SAMPLE_RATE, 0.0));
        out
    }

    fn argmax(signal: &[f32]) -> usize {
        signal
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &s)| if s > best.1 { (i, s) } else { best })
            .0
    }

    #[test]
    fn echo_arrives_after_delay_time() {
        let mut delay = wet_only(0.0);
        let out = impulse_response(&mut delay, 64);

        assert!(out[..10].iter().all(|&s| s == 0.0));
        assert_eq!(argmax(&out), 10);
        assert!(out[10] > 0.9);
    }

    #[test]
    fn feedback_repeats_and_decays() {
        let mut delay = wet_only(0.5);
        let out = impulse_response(&mut delay, 64);

        let first = out[8..13].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let second = out[18..23].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let third = out[28..33].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(second > 0.3 && second < first);
        assert!(third < second);
    }

    #[test]
    fn full_feedback_stays_bounded() {
        let mut delay = FeedbackDelay::new(
            SAMPLE_RATE,
            DelayOptions {
                delay_time: 0.05,
                pre_gain: 1.0,
                feedback: 1.0,
                filter_frequency: 200.0,
                direct_sound: None,
                ..DelayOptions::default()
            },
        );
        let out = impulse_response(&mut delay, 2_000);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() < 2.0));
    }

    #[test]
    fn direct_sound_passes_dry_signal() {
        let mut delay = FeedbackDelay::new(SAMPLE_RATE, DelayOptions::default());
        let out = impulse_response(&mut delay, 4);
        assert_eq!(out[0], 1.0);

        let mut wet = wet_only(0.8);
        assert_eq!(impulse_response(&mut wet, 4)[0], 0.0);
        assert!(wet.direct_sound().is_none());
    }

    #[test]
    fn feedback_is_clamped_to_unity() {
        let mut delay = wet_only(0.5);
        delay.feedback().set_value(3.0);
        assert_eq!(delay.feedback().value(), 1.0);
    }

    #[test]
    fn delay_time_cannot_exceed_buffer() {
        let mut delay = FeedbackDelay::new(
            SAMPLE_RATE,
            DelayOptions {
                max_delay_time: 0.02,
                ..DelayOptions::default()
            },
        );
        delay.delay_time().set_value(0.5);
        assert_eq!(delay.delay_time().value(), 0.02);
    }
}
