//! Smoothable control values.

/*
Parameter Channels
==================

A parameter channel is one automatable control value on a node. It wraps
an automation timeline (see `dsp::automation`) and renders it to one value
per sample for the block being processed:

    set_value(v)                          jump now, drop scheduled events
    set_value_at_time(v, t)               jump at t
    linear_ramp_to_value_at_time(v, t)    line from the previous event
    exponential_ramp_to_value_at_time     curve from the previous event
    set_target_at_time(v, t, τ)           approach v from t with constant τ

Live changes coming from the network always use `set_target_at_time` with
LIVE_TIME_CONSTANT, and the bus mute uses MUTE_TIME_CONSTANT. Neither is
configurable.


Variants
--------

AudioParam         the plain channel, in the node's native (linear) unit
DecibelParam       the same contract in dB: dB → linear on every write,
                   linear → dB on every read. Automation runs on the linear
                   value underneath.
CompensatedParam   a drive amount v rendered as two gains:

                       pre  = v
                       post = 1 / v

                   `post` is derived sample by sample from the same
                   rendered `pre`, so pre × post = 1 at every sample,
                   whatever mutator (jump or ramp) moved v.
*/

use crate::{
    dsp::{
        amplify::{db_to_linear, linear_to_db},
        automation::Automation,
    },
    MAX_BLOCK_SIZE,
};

/// Smoothing time constant for live parameter updates, in seconds.
pub const LIVE_TIME_CONSTANT: f64 = 0.01;
/// Smoothing time constant of the bus mute gain, in seconds.
pub const MUTE_TIME_CONSTANT: f64 = 0.005;

pub trait ParameterChannel: Send {
    /// Current value, in the channel's unit.
    fn value(&self) -> f32;
    fn set_value(&mut self, value: f32);
    fn set_value_at_time(&mut self, value: f32, time: f64);
    fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64);
    fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64);
    fn set_target_at_time(&mut self, target: f32, start_time: f64, time_constant: f64);
    fn cancel_scheduled_values(&mut self, time: f64);
}

pub struct AudioParam {
    automation: Automation,
    min: f32,
    max: f32,
    values: Vec<f32>,
}

impl AudioParam {
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        Self {
            automation: Automation::new(value),
            min,
            max,
            values: vec![value.clamp(min, max); MAX_BLOCK_SIZE],
        }
    }

    /// A channel without a nominal range.
    pub fn unbounded(value: f32) -> Self {
        Self::new(value, f32::MIN, f32::MAX)
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn value_at(&self, time: f64) -> f32 {
        self.automation.value_at(time).clamp(self.min, self.max)
    }

    pub fn automation(&self) -> &Automation {
        &self.automation
    }

    /// Render `frames` values starting at `start_time`, then fold the
    /// events that have elapsed by the end of the block.
    pub fn render(&mut self, start_time: f64, frames: usize, sample_rate: f32) -> &[f32] {
        let frames = frames.min(MAX_BLOCK_SIZE);
        let values = &mut self.values[..frames];
        self.automation.fill(values, start_time, sample_rate);
        for value in values.iter_mut() {
            *value = value.clamp(self.min, self.max);
        }
        self.automation
            .advance_to(start_time + frames as f64 / sample_rate as f64);
        &self.values[..frames]
    }

    /// Values of the last rendered block.
    pub fn rendered(&self, frames: usize) -> &[f32] {
        &self.values[..frames.min(MAX_BLOCK_SIZE)]
    }
}

impl ParameterChannel for AudioParam {
    fn value(&self) -> f32 {
        self.automation.value().clamp(self.min, self.max)
    }

    fn set_value(&mut self, value: f32) {
        self.automation.set_value(value);
    }

    fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.automation.set_value_at_time(value, time);
    }

    fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.automation.linear_ramp_to_value_at_time(value, time);
    }

    fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.automation.exponential_ramp_to_value_at_time(value, time);
    }

    fn set_target_at_time(&mut self, target: f32, start_time: f64, time_constant: f64) {
        self.automation
            .set_target_at_time(target, start_time, time_constant);
    }

    fn cancel_scheduled_values(&mut self, time: f64) {
        self.automation.cancel_scheduled_values(time);
    }
}

/// A linear gain channel controlled in decibels.
pub struct DecibelParam {
    gain: AudioParam,
}

impl DecibelParam {
    pub fn new(db: f32) -> Self {
        Self {
            gain: AudioParam::new(db_to_linear(db), 0.0, f32::MAX),
        }
    }

    /// The linear gain underneath.
    pub fn gain(&self) -> &AudioParam {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut AudioParam {
        &mut self.gain
    }

    pub fn render(&mut self, start_time: f64, frames: usize, sample_rate: f32) -> &[f32] {
        self.gain.render(start_time, frames, sample_rate)
    }
}

impl ParameterChannel for DecibelParam {
    fn value(&self) -> f32 {
        linear_to_db(self.gain.value())
    }

    fn set_value(&mut self, db: f32) {
        self.gain.set_value(db_to_linear(db));
    }

    fn set_value_at_time(&mut self, db: f32, time: f64) {
        self.gain.set_value_at_time(db_to_linear(db), time);
    }

    fn linear_ramp_to_value_at_time(&mut self, db: f32, time: f64) {
        self.gain.linear_ramp_to_value_at_time(db_to_linear(db), time);
    }

    fn exponential_ramp_to_value_at_time(&mut self, db: f32, time: f64) {
        self.gain
            .exponential_ramp_to_value_at_time(db_to_linear(db), time);
    }

    fn set_target_at_time(&mut self, db: f32, start_time: f64, time_constant: f64) {
        self.gain
            .set_target_at_time(db_to_linear(db), start_time, time_constant);
    }

    fn cancel_scheduled_values(&mut self, time: f64) {
        self.gain.cancel_scheduled_values(time);
    }
}

/// Pre-gain `v` with a post-gain locked to `1 / v`.
pub struct CompensatedParam {
    pre: AudioParam,
    post: Vec<f32>,
}

impl CompensatedParam {
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        let min = min.max(f32::MIN_POSITIVE);
        let initial = value.clamp(min, max);
        Self {
            pre: AudioParam::new(value, min, max),
            post: vec![1.0 / initial; MAX_BLOCK_SIZE],
        }
    }

    pub fn pre(&self) -> &AudioParam {
        &self.pre
    }

    pub fn post_value(&self) -> f32 {
        1.0 / self.pre.value()
    }

    pub fn post_value_at(&self, time: f64) -> f32 {
        1.0 / self.pre.value_at(time)
    }

    /// Render both gain curves for one block: `(pre, post)`.
    pub fn render(&mut self, start_time: f64, frames: usize, sample_rate: f32) -> (&[f32], &[f32]) {
        let frames = frames.min(MAX_BLOCK_SIZE);
        let pre = self.pre.render(start_time, frames, sample_rate);
        for (post, &pre) in self.post[..frames].iter_mut().zip(pre) {
            *post = 1.0 / pre;
        }
        (pre, &self.post[..frames])
    }
}

impl ParameterChannel for CompensatedParam {
    fn value(&self) -> f32 {
        self.pre.value()
    }

    fn set_value(&mut self, value: f32) {
        self.pre.set_value(value);
    }

    fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.pre.set_value_at_time(value, time);
    }

    fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.pre.linear_ramp_to_value_at_time(value, time);
    }

    fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.pre.exponential_ramp_to_value_at_time(value, time);
    }

    fn set_target_at_time(&mut self, target: f32, start_time: f64, time_constant: f64) {
        self.pre.set_target_at_time(target, start_time, time_constant);
    }

    fn cancel_scheduled_values(&mut self, time: f64) {
        self.pre.cancel_scheduled_values(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn values_are_clamped_to_nominal_range() {
        let mut param = AudioParam::new(0.5, 0.0, 1.0);
        param.set_value(3.0);
        assert_eq!(param.value(), 1.0);

        param.set_value_at_time(-2.0, 0.0);
        let block = param.render(0.0, 4, 1_000.0);
        assert!(block.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn render_advances_the_timeline() {
        let mut param = AudioParam::new(0.0, 0.0, 1.0);
        param.linear_ramp_to_value_at_time(1.0, 0.004);
        let block = param.render(0.0, 4, 1_000.0).to_vec();
        for (value, expected) in block.iter().zip([0.0, 0.25, 0.5, 0.75]) {
            assert_relative_eq!(*value, expected, epsilon = 1e-6);
        }

        assert_eq!(param.automation().now(), 0.004);
        assert_relative_eq!(param.value(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn decibel_round_trip_over_bus_range() {
        let mut volume = DecibelParam::new(0.0);
        let mut db = -80.0;
        while db <= 12.0 {
            volume.set_value(db);
            assert_relative_eq!(volume.value(), db, epsilon = 1e-3);
            db += 0.5;
        }
    }

    #[test]
    fn decibel_writes_land_linear() {
        let mut volume = DecibelParam::new(0.0);
        volume.set_value(-20.0);
        assert_relative_eq!(volume.gain().value(), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn decibel_target_smooths_linear_gain() {
        let mut volume = DecibelParam::new(0.0);
        volume.set_target_at_time(-80.0, 0.0, LIVE_TIME_CONSTANT);
        let gain = volume.render(0.0, 480, 48_000.0);
        // one time constant later: 63% of the way from 1.0 to 0.0001
        assert_relative_eq!(gain[479], 1.0 - 0.632 * (1.0 - 1e-4), epsilon = 2e-3);
    }

    #[test]
    fn compensation_holds_for_jumps() {
        let mut drive = CompensatedParam::new(1.0, 0.1, 25.0);
        for v in [0.1, 0.5, 1.0, 3.3, 25.0] {
            drive.set_value(v);
            assert_relative_eq!(drive.value() * drive.post_value(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn compensation_holds_every_sample_of_a_ramp() {
        let mut drive = CompensatedParam::new(1.0, 0.1, 25.0);
        drive.set_value_at_time(1.0, 0.0);
        drive.linear_ramp_to_value_at_time(25.0, 0.01);
        drive.set_target_at_time(0.1, 0.01, 0.002);

        for block in 0..4 {
            let start = block as f64 * 0.005;
            let (pre, post) = drive.render(start, 240, 48_000.0);
            for (&a, &b) in pre.iter().zip(post) {
                assert_relative_eq!(a * b, 1.0, epsilon = 1e-6);
            }
        }
    }
}
