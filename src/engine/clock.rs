//! Time sources: the local audio clock and the cross-machine sync clock.

/*
Synchronized Start
==================

Every machine has its own audio clock, started at its own moment. The sync
clock gives all of them one shared timeline:

    sync_time()            shared "now", identical on every machine
    to_local_time(sync)    where a shared instant falls on THIS machine's
                           audio clock

To start something everywhere at once, whoever issues the cue picks a
shared instant slightly in the future:

    start = sync_time() + lead          (lead = 1 s by default)

Each machine receiving the cue then plans its start:

    start >= sync now   →  schedule at to_local_time(start)
    start <  sync now   →  the cue arrived late: start right away,
                           skipping (now - start) seconds into the sound

so a late machine joins in phase instead of missing the cue.
*/

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use super::scheduler::TimeSource;

pub const DEFAULT_SYNC_LEAD: f64 = 1.0;

/// Logical time derived from frames rendered.
///
/// Clones share the same counter: the audio thread advances it, any
/// other thread may read it.
#[derive(Debug, Clone)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    pub fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::Release);
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl TimeSource for AudioClock {
    fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate
    }
}

/// Hand-driven time source for tests and offline rendering.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, time: f64) {
        self.bits.store(time.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// Shared time base across machines.
pub trait SyncClock {
    fn sync_time(&self) -> f64;

    fn to_local_time(&self, sync_time: f64) -> f64;
}

/// Sync clock at a fixed offset from a local time source.
///
/// `offset` is sync time minus local time, as estimated by whatever sync
/// protocol runs outside the engine.
#[derive(Debug, Clone)]
pub struct OffsetSyncClock<C> {
    local: C,
    offset: f64,
}

impl<C: TimeSource> OffsetSyncClock<C> {
    pub fn new(local: C, offset: f64) -> Self {
        Self { local, offset }
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }
}

impl<C: TimeSource> SyncClock for OffsetSyncClock<C> {
    fn sync_time(&self) -> f64 {
        self.local.now() + self.offset
    }

    fn to_local_time(&self, sync_time: f64) -> f64 {
        sync_time - self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartPlan {
    /// Start at this local time, from the beginning.
    At(f64),
    /// Start now, `offset` seconds into the sound.
    Immediate { offset: f64 },
}

/// Plan a local start for a cue at shared time `start_sync_time`.
pub fn plan_synced_start(clock: &impl SyncClock, start_sync_time: f64) -> StartPlan {
    let now = clock.sync_time();
    if start_sync_time >= now {
        StartPlan::At(clock.to_local_time(start_sync_time))
    } else {
        StartPlan::Immediate {
            offset: now - start_sync_time,
        }
    }
}

/// Shared start time for a cue issued now, `lead` seconds ahead.
pub fn schedule_sync_start(clock: &impl SyncClock, lead: f64) -> f64 {
    clock.sync_time() + lead.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_clock_counts_frames() {
        let clock = AudioClock::new(48_000.0);
        let reader = clock.clone();
        clock.advance(24_000);
        assert_eq!(reader.now(), 0.5);
    }

    #[test]
    fn cue_in_the_future_is_scheduled_locally() {
        let local = ManualClock::new();
        local.set(10.0);
        let sync = OffsetSyncClock::new(local, 100.0);

        let start = schedule_sync_start(&sync, DEFAULT_SYNC_LEAD);
        assert_eq!(start, 111.0);
        assert_eq!(plan_synced_start(&sync, start), StartPlan::At(11.0));
    }

    #[test]
    fn late_cue_starts_with_offset() {
        let local = ManualClock::new();
        local.set(10.0);
        let sync = OffsetSyncClock::new(local.clone(), 100.0);

        let start = schedule_sync_start(&sync, DEFAULT_SYNC_LEAD);
        local.set(12.5);
        assert_eq!(
            plan_synced_start(&sync, start),
            StartPlan::Immediate { offset: 1.5 }
        );
    }

    #[test]
    fn machines_with_different_offsets_agree_on_the_instant() {
        let a_local = ManualClock::new();
        a_local.set(3.0);
        let b_local = ManualClock::new();
        b_local.set(250.0);

        // both see sync time 1000.0 right now
        let a = OffsetSyncClock::new(a_local, 997.0);
        let b = OffsetSyncClock::new(b_local, 750.0);

        let start = schedule_sync_start(&a, 1.0);
        assert_eq!(plan_synced_start(&a, start), StartPlan::At(4.0));
        assert_eq!(plan_synced_start(&b, start), StartPlan::At(251.0));
    }
}
