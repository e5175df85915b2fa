use std::str::FromStr;

use tracing::{debug, info};

use crate::{
    engine::{
        clock::{plan_synced_start, schedule_sync_start, StartPlan, SyncClock, DEFAULT_SYNC_LEAD},
        Engine,
    },
    graph::{
        node::{NodeHandle, Sink},
        source::BufferSource,
        GraphError,
    },
    io::SharedBuffer,
};

/// Shared intro state, as published by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroState {
    Play,
    Stop,
}

impl FromStr for IntroState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "play" => Ok(Self::Play),
            "stop" => Ok(Self::Stop),
            other => Err(format!("unknown intro state `{other}`")),
        }
    }
}

/// Plays one buffer in lockstep across machines.
///
/// Every machine receives the same shared start time. A machine that gets
/// the cue in time schedules the buffer at the local equivalent of that
/// time. One that gets it late starts immediately, skipping the part it
/// missed, so all machines are sample-aligned from then on.
pub struct IntroPlayer<S> {
    clock: S,
    buffer: SharedBuffer,
    lead: f64,
    source: Option<NodeHandle<BufferSource>>,
}

impl<S: SyncClock> IntroPlayer<S> {
    pub fn new(clock: S, buffer: SharedBuffer) -> Self {
        Self {
            clock,
            buffer,
            lead: DEFAULT_SYNC_LEAD,
            source: None,
        }
    }

    pub fn with_lead(mut self, lead: f64) -> Self {
        self.lead = lead;
        self
    }

    pub fn clock(&self) -> &S {
        &self.clock
    }

    /// The shared start time to publish for a cue issued now.
    pub fn cue(&self) -> f64 {
        schedule_sync_start(&self.clock, self.lead)
    }

    /// Apply a state change. Any previous playback is stopped first.
    pub fn set_state(
        &mut self,
        engine: &mut Engine,
        state: IntroState,
        start_sync_time: f64,
    ) -> Result<Option<StartPlan>, GraphError> {
        self.stop(engine);
        if state == IntroState::Stop {
            return Ok(None);
        }

        let plan = plan_synced_start(&self.clock, start_sync_time);
        let mut source = BufferSource::new(self.buffer.clone());
        match plan {
            StartPlan::At(local_time) => source.start(local_time, 0.0),
            StartPlan::Immediate { offset } => source.start(engine.now(), offset),
        }

        let source = engine.add_node(source);
        engine.connect(source.id(), Sink::Output)?;
        self.source = Some(source);
        info!(?plan, start_sync_time, "intro scheduled");
        Ok(Some(plan))
    }

    pub fn stop(&mut self, engine: &mut Engine) {
        let Some(source) = self.source.take() else {
            return;
        };
        let now = engine.now();
        // a source that already played out has left the graph
        if let Ok(source) = engine.graph_mut().get_mut(source) {
            source.stop(now);
            debug!(now, "intro stopped");
        }
    }

    pub fn is_active(&self, engine: &Engine) -> bool {
        self.source
            .is_some_and(|source| engine.graph().contains(source.id()))
    }
}
