//! Sample-accurate parameter automation timeline.

/*
Parameter Automation
====================

A control value (a gain, a delay time, a filter cutoff) is not a number that
changes "between blocks". It is a function of time, evaluated once per
sample. The timeline stores scheduled events and answers "what is the value
at time t?".

Events
------

  SetValue(v, t)          jump to v at t
  LinearRamp(v, t)        straight line from the previous event to v at t
  ExponentialRamp(v, t)   geometric curve from the previous event to v at t
  SetTarget(v, t, τ)      from t on, approach v exponentially with time
                          constant τ (never quite reaching it)

Events are kept sorted by time. Events scheduled for the same time keep the
order in which they were scheduled.


Ramps Start From The Previous Event
-----------------------------------

A ramp has only an END point. Its start is the time and value of whatever
event came before it:

    set_value_at_time(0.0, 1.0)
    linear_ramp_to_value_at_time(1.0, 1.5)
    linear_ramp_to_value_at_time(0.0, 2.0)

    value
    1.0 ┤        ╱╲
        │      ╱    ╲
    0.0 ┼────╱────────╲─────→ time
            1.0  1.5  2.0

This is exactly the triangular grain envelope.

With no previous event, a ramp starts from the settled value at the time
the timeline was last advanced to.

A target curve has no end point, so a ramp scheduled after one starts
where the curve is when the ramp is scheduled: at the later of the
target's start and `now`. The curve is pinned there with a SetValue, and
a target that has not started yet is replaced by the ramp.


The Target Curve
----------------

    value(t) = target + (start - target) × e^(-(t - t0) / τ)

After τ seconds the value has covered ~63% of the distance, after 5τ about
99.3%. Live knob changes use this with a small τ (5-30 ms): the change is
fast enough to feel immediate but never a step, so it never clicks.


Exponential Ramps
-----------------

    value(t) = v0 × (v1 / v0)^((t - t0) / (t1 - t0))

Undefined when v0 or v1 is zero or their signs differ. In that case the
previous value is held and the ramp jumps to v1 at t1.


Settling
--------

Events whose time has passed are folded into a "settled" state by
`advance_to`. Evaluation only ever walks the few events still ahead, which
keeps per-sample evaluation cheap.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    SetValue { value: f32, time: f64 },
    LinearRamp { value: f32, time: f64 },
    ExponentialRamp { value: f32, time: f64 },
    SetTarget {
        target: f32,
        time: f64,
        time_constant: f64,
    },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match *self {
            Self::SetValue { time, .. }
            | Self::LinearRamp { time, .. }
            | Self::ExponentialRamp { time, .. }
            | Self::SetTarget { time, .. } => time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Settled {
    Hold {
        value: f32,
    },
    Target {
        start: f32,
        target: f32,
        time_constant: f64,
    },
}

impl Settled {
    /// Value of the settled curve at `t`, for a curve anchored at `anchor`.
    #[inline]
    fn value(&self, anchor: f64, t: f64) -> f32 {
        match *self {
            Settled::Hold { value } => value,
            Settled::Target {
                start,
                target,
                time_constant,
            } => {
                if time_constant <= 0.0 {
                    return target;
                }
                let elapsed = (t - anchor).max(0.0);
                target + (start - target) * (-elapsed / time_constant).exp() as f32
            }
        }
    }

    /// State after `event` fires at `time`.
    #[inline]
    fn after(self, event: &AutomationEvent, anchor: f64, time: f64) -> Settled {
        match *event {
            AutomationEvent::SetValue { value, .. }
            | AutomationEvent::LinearRamp { value, .. }
            | AutomationEvent::ExponentialRamp { value, .. } => Settled::Hold { value },
            AutomationEvent::SetTarget {
                target,
                time_constant,
                ..
            } => Settled::Target {
                start: self.value(anchor, time),
                target,
                time_constant,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Automation {
    settled: Settled,
    /// Time of the last folded event; ramps start here.
    anchor: f64,
    /// Time the timeline was last advanced to.
    now: f64,
    events: Vec<AutomationEvent>,
}

impl Automation {
    pub fn new(value: f32) -> Self {
        Self {
            settled: Settled::Hold { value },
            anchor: 0.0,
            now: 0.0,
            events: Vec::with_capacity(8),
        }
    }

    /// Value at the time the timeline was last advanced to.
    pub fn value(&self) -> f32 {
        self.value_at(self.now)
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// True when no event is pending and the value is constant.
    pub fn is_static(&self) -> bool {
        self.events.is_empty() && matches!(self.settled, Settled::Hold { .. })
    }

    pub fn pending(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Jump to `value` immediately, dropping every scheduled event.
    pub fn set_value(&mut self, value: f32) {
        self.events.clear();
        self.settled = Settled::Hold { value };
        self.anchor = self.now;
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::SetValue { value, time });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.pin_target_before(time);
        self.insert(AutomationEvent::LinearRamp { value, time });
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.pin_target_before(time);
        self.insert(AutomationEvent::ExponentialRamp { value, time });
    }

    pub fn set_target_at_time(&mut self, target: f32, start_time: f64, time_constant: f64) {
        self.insert(AutomationEvent::SetTarget {
            target,
            time: start_time,
            time_constant: time_constant.max(0.0),
        });
    }

    /// Remove every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|event| event.time() < time);
    }

    /// If a ramp ending at `time` would follow a target curve, freeze the
    /// curve at the point the ramp starts from.
    fn pin_target_before(&mut self, time: f64) {
        let index = self.events.partition_point(|e| e.time() <= time);
        let curve_start = match index.checked_sub(1).map(|i| &self.events[i]) {
            Some(AutomationEvent::SetTarget { time, .. }) => *time,
            Some(_) => return,
            None if matches!(self.settled, Settled::Target { .. }) => self.anchor,
            None => return,
        };

        let start = curve_start.max(self.now);
        if start > time {
            return;
        }
        let value = self.value_at(start);
        self.insert(AutomationEvent::SetValue { value, time: start });
    }

    fn insert(&mut self, event: AutomationEvent) {
        let time = event.time();
        // Upper bound: same-time events stay in call order.
        let index = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(index, event);
    }

    /// Evaluate the timeline at `t` without mutating it.
    pub fn value_at(&self, t: f64) -> f32 {
        let mut state = self.settled;
        let mut anchor = self.anchor;

        for event in &self.events {
            let time = event.time();

            if time > t {
                return match *event {
                    AutomationEvent::LinearRamp { value, time } => {
                        let start = state.value(anchor, anchor);
                        linear(start, value, anchor, time, t)
                    }
                    AutomationEvent::ExponentialRamp { value, time } => {
                        let start = state.value(anchor, anchor);
                        exponential(start, value, anchor, time, t)
                    }
                    _ => state.value(anchor, t),
                };
            }

            let time = time.max(anchor);
            state = state.after(event, anchor, time);
            anchor = time;
        }

        state.value(anchor, t)
    }

    /// Fill `out` with one value per sample starting at `start_time`.
    pub fn fill(&self, out: &mut [f32], start_time: f64, sample_rate: f32) {
        if self.is_static() {
            out.fill(self.value_at(start_time));
            return;
        }

        let dt = 1.0 / sample_rate as f64;
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.value_at(start_time + i as f64 * dt);
        }
    }

    /// Fold every event at or before `t` into the settled state.
    pub fn advance_to(&mut self, t: f64) {
        let due = self.events.partition_point(|e| e.time() <= t);
        for event in self.events.drain(..due) {
            let time = event.time().max(self.anchor);
            self.settled = self.settled.after(&event, self.anchor, time);
            self.anchor = time;
        }
        self.now = self.now.max(t);
    }
}

impl Default for Automation {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[inline]
fn linear(start: f32, end: f32, t0: f64, t1: f64, t: f64) -> f32 {
    if t1 <= t0 {
        return end;
    }
    let progress = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0) as f32;
    start + (end - start) * progress
}

#[inline]
fn exponential(start: f32, end: f32, t0: f64, t1: f64, t: f64) -> f32 {
    if t1 <= t0 {
        return end;
    }
    if start == 0.0 || end == 0.0 || start.signum() != end.signum() {
        return start;
    }
    let progress = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0) as f32;
    start * (end / start).powf(progress)
}
