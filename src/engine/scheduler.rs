//! Logical-time callback scheduling.

/*
Logical-Time Scheduling
=======================

Grain generation is a self-rescheduling callback:

    time ─────●─────────●─────────●─────────●────→
              render    render    render    render
              returns   returns   returns   ...
              t + p     t + 2p    t + 3p

Each invocation returns the absolute time of its next invocation. The next
time is computed from the CURRENT logical time, never from when the
callback actually ran, so scheduling never drifts.

Time is the audio clock (frames rendered / sample rate), not the wall
clock. The engine runs every callback due before the end of the block
plus a lookahead, so grains are scheduled slightly ahead of the block in
which they sound and start sample-accurately.


Contract
--------

    add(initial_time)   register a callback, first fire at initial_time
    reset(id, time)     move a callback's next fire time, cancelling the
                        pending one. f64::INFINITY parks it: it stays
                        registered but is never reached.
    next_time(id)       when the callback will next fire

A callback is never deregistered by a failure. If it returns an error, or a
next time that does not move forward, the failure is logged and the
callback is re-armed `retry_interval` later.
*/

use std::fmt::Display;

use tracing::warn;

use crate::config::SchedulerConfig;

/// Identifies one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

impl Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "callback#{}", self.0)
    }
}

/// Monotonic source of logical time, in seconds.
pub trait TimeSource: Send {
    fn now(&self) -> f64;
}

pub trait Scheduler {
    fn current_time(&self) -> f64;

    fn add(&mut self, initial_time: f64) -> CallbackId;

    fn reset(&mut self, id: CallbackId, time: f64);

    fn next_time(&self, id: CallbackId) -> Option<f64>;
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    id: CallbackId,
    next: f64,
}

/// Single-threaded scheduler over a [`TimeSource`].
///
/// Only bookkeeping lives here. The work of a callback is passed to
/// [`run_until`](Self::run_until), which keeps callbacks free to borrow the
/// state they act on.
pub struct LogicalScheduler<C> {
    clock: C,
    slots: Vec<Slot>,
    next_id: u64,
    retry_interval: f64,
}

impl<C: TimeSource> LogicalScheduler<C> {
    pub fn new(clock: C, config: &SchedulerConfig) -> Self {
        Self {
            clock,
            slots: Vec::new(),
            next_id: 0,
            retry_interval: config.retry_interval.max(f64::EPSILON),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Earliest pending callback before `horizon`. Ties fire in
    /// registration order.
    fn due(&self, horizon: f64) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.next >= horizon {
                continue;
            }
            match best {
                Some(b) if self.slots[b].next <= slot.next => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Run every callback due strictly before `horizon`, in time order.
    ///
    /// `callback` receives the id and the logical time it was scheduled for
    /// and returns the next absolute fire time. Returns how many callbacks
    /// ran.
    pub fn run_until<E, F>(&mut self, horizon: f64, mut callback: F) -> usize
    where
        E: Display,
        F: FnMut(CallbackId, f64) -> Result<f64, E>,
    {
        let mut fired = 0;

        while let Some(index) = self.due(horizon) {
            let Slot { id, next: time } = self.slots[index];
            fired += 1;

            let next = match callback(id, time) {
                Ok(next) if next > time => next,
                Ok(next) => {
                    warn!(%id, time, next, "callback did not advance, retrying");
                    time + self.retry_interval
                }
                Err(err) => {
                    warn!(%id, time, error = %err, "callback failed, retrying");
                    time + self.retry_interval
                }
            };
            self.slots[index].next = next;
        }

        fired
    }
}

impl<C: TimeSource> Scheduler for LogicalScheduler<C> {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn add(&mut self, initial_time: f64) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot {
            id,
            next: initial_time,
        });
        id
    }

    fn reset(&mut self, id: CallbackId, time: f64) {
        match self.slots.iter_mut().find(|slot| slot.id == id) {
            Some(slot) => slot.next = time,
            None => warn!(%id, "reset of unknown callback"),
        }
    }

    fn next_time(&self, id: CallbackId) -> Option<f64> {
        self.slots
            .iter()
            .find(|slot| slot.id == id)
            .map(|slot| slot.next)
    }
}
