//! Per-block driver tying the scheduler, the graph and the router together.

/*
One Block
=========

    ┌──────────────────────────────────────────────────────────────┐
    │ 1. run scheduler callbacks due before block_end + lookahead  │
    │    (each fire is one GranularAudioPlayer::render)            │
    │ 2. render the graph in topological order                     │
    │ 3. drop finished nodes (one-shot sources)                    │
    │ 4. advance the audio clock by the block length               │
    └──────────────────────────────────────────────────────────────┘

Remote updates are applied between blocks with `apply_update` at the
current clock time. Nothing in here blocks or locks: whatever feeds
updates from other threads does so through a queue it drains before
calling `render_block`.
*/

pub mod clock;
pub mod scheduler;

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use self::{
    clock::AudioClock,
    scheduler::{CallbackId, LogicalScheduler, Scheduler},
};
use crate::{
    config::EngineConfig,
    control::{
        router::{ApplyReport, ControlCtx, Controllable, ParameterRouter, ParameterUpdate},
        Schema,
    },
    graph::{
        granular::{GranularAudioPlayer, PlayerOptions},
        node::{NodeHandle, NodeId, RenderCtx, SignalNode, Sink},
        patch::SignalGraph,
        GraphError,
    },
    io::AudioOutput,
    Error, MAX_BLOCK_SIZE,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Control queue is full")]
    QueueFull,

    #[error("No player is registered for {0}")]
    UnknownCallback(CallbackId),
}

pub struct Engine {
    config: EngineConfig,
    graph: SignalGraph,
    scheduler: LogicalScheduler<AudioClock>,
    router: ParameterRouter,
    schema: Schema,
    players: HashMap<CallbackId, NodeHandle<GranularAudioPlayer>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> crate::Result<Self> {
        config.validate()?;

        let clock = AudioClock::new(config.sample_rate);
        let scheduler = LogicalScheduler::new(clock, &config.scheduler);
        debug!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            "engine created"
        );

        Ok(Self {
            config,
            graph: SignalGraph::new(),
            scheduler,
            router: ParameterRouter::new(),
            schema: Schema::new(),
            players: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    /// Logical time at the start of the next block.
    pub fn now(&self) -> f64 {
        self.scheduler.current_time()
    }

    /// The clock the engine advances. Clones share the counter.
    pub fn clock(&self) -> &AudioClock {
        self.scheduler.clock()
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SignalGraph {
        &mut self.graph
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn add_node<N: SignalNode>(&mut self, node: N) -> NodeHandle<N> {
        self.graph.add(node)
    }

    /// Add a granular player and wire its render callback to the scheduler.
    pub fn add_player(&mut self, options: PlayerOptions) -> NodeHandle<GranularAudioPlayer> {
        let player = GranularAudioPlayer::new(&mut self.scheduler, options);
        let callback = player.callback_id();
        let handle = self.graph.add(player);
        self.players.insert(callback, handle);
        handle
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let callback = self
            .players
            .iter()
            .find_map(|(callback, handle)| (handle.id() == id).then_some(*callback));
        if let Some(callback) = callback {
            self.scheduler.reset(callback, f64::INFINITY);
            self.players.remove(&callback);
        }
        self.graph.remove(id)
    }

    pub fn connect(&mut self, from: NodeId, to: impl Into<Sink>) -> Result<(), GraphError> {
        self.graph.connect(from, to)
    }

    pub fn disconnect(&mut self, from: NodeId) -> Result<(), GraphError> {
        self.graph.disconnect(from)
    }

    /// Route `"{namespace}:*"` updates to `handle` and publish its parameters.
    pub fn bind<N: Controllable>(&mut self, namespace: &str, handle: NodeHandle<N>) {
        self.schema.insert_namespace(namespace, N::PARAMS);
        self.router.bind(namespace, handle);
    }

    pub fn is_bound(&self, namespace: &str) -> bool {
        self.router.is_bound(namespace)
    }

    /// Apply one remote batch at the current logical time.
    pub fn apply_update(&mut self, update: &ParameterUpdate) -> ApplyReport {
        let mut ctx = ControlCtx {
            now: self.scheduler.current_time(),
            scheduler: &mut self.scheduler,
        };
        self.router
            .apply(update, &self.schema, &mut self.graph, &mut ctx)
    }

    /// Run `f` on a node with the control context a router action would get.
    pub fn with_node<N: SignalNode, R>(
        &mut self,
        handle: NodeHandle<N>,
        f: impl FnOnce(&mut N, &mut ControlCtx<'_>) -> R,
    ) -> Result<R, GraphError> {
        let node = self.graph.get_mut(handle)?;
        let mut ctx = ControlCtx {
            now: self.scheduler.current_time(),
            scheduler: &mut self.scheduler,
        };
        Ok(f(node, &mut ctx))
    }

    /// Render mono into `out`, in sub-blocks of at most `MAX_BLOCK_SIZE`.
    pub fn render_block(&mut self, out: &mut [f32]) {
        let sample_rate = self.config.sample_rate;
        let lookahead = self.config.scheduler.lookahead;

        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            let ctx = RenderCtx::new(sample_rate, self.scheduler.current_time());
            let horizon = ctx.block_end(chunk.len()) + lookahead;

            let graph = &mut self.graph;
            let players = &self.players;
            self.scheduler
                .run_until(horizon, |callback, time| -> Result<f64, Error> {
                    let handle = players
                        .get(&callback)
                        .ok_or(EngineError::UnknownCallback(callback))?;
                    Ok(graph.get_mut(*handle)?.render(time)?)
                });

            self.graph.render(chunk, &ctx);
            self.graph.prune_finished();
            self.scheduler.clock().advance(chunk.len());
        }
    }

    /// Render one block and copy it to every output channel.
    pub fn process_block(&mut self, output: &mut AudioOutput) {
        if output.buffers.is_empty() {
            *output = AudioOutput::new(self.config.channels, self.config.block_size);
        }

        let Some((first, rest)) = output.buffers.split_first_mut() else {
            return;
        };
        self.render_block(first);
        for channel in rest {
            let frames = channel.len().min(first.len());
            channel[..frames].copy_from_slice(&first[..frames]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{amplify::Gain, bus::AudioBus},
        io::AudioBuffer,
    };

    const SAMPLE_RATE: f32 = 1_000.0;

    fn engine() -> Engine {
        Engine::new(EngineConfig {
            sample_rate: SAMPLE_RATE,
            block_size: 100,
            channels: 2,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn seeded() -> PlayerOptions {
        PlayerOptions {
            seed: Some(1),
            ..PlayerOptions::default()
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            channels: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn clock_advances_per_block() {
        let mut engine = engine();
        let mut out = vec![0.0; 250];
        engine.render_block(&mut out);
        assert_eq!(engine.clock().frames(), 250);
        assert_eq!(engine.now(), 0.25);
    }

    #[test]
    fn process_block_fills_every_channel() {
        let mut engine = engine();
        let gain = engine.add_node(Gain::new(1.0));
        engine.connect(gain.id(), Sink::Output).unwrap();

        let player = engine.add_player(seeded());
        engine.connect(player.id(), gain).unwrap();
        engine
            .with_node(player, |player, ctx| {
                player.set_buffer(AudioBuffer::from_mono(vec![0.5; 2_000], 1_000).shared());
                player.start(ctx.scheduler);
            })
            .unwrap();

        let mut output = AudioOutput::default();
        engine.process_block(&mut output);
        assert_eq!(output.buffers.len(), 2);
        assert_eq!(output.frames(), 100);
        assert_eq!(output.buffers[0], output.buffers[1]);
        assert!(output.buffers[0].iter().any(|&s| s > 0.0));
    }

    #[test]
    fn started_player_emits_grains_ahead_of_the_block() {
        let mut engine = engine();
        let player = engine.add_player(seeded());
        engine
            .with_node(player, |player, ctx| {
                player.set_buffer(AudioBuffer::from_mono(vec![1.0; 2_000], 1_000).shared());
                player.start(ctx.scheduler);
            })
            .unwrap();

        let mut out = vec![0.0; 100];
        engine.render_block(&mut out);

        // ticks at 0.0 and 0.1 fall before 0.1 + 0.05 lookahead
        let player = engine.graph().get(player).unwrap();
        assert_eq!(player.grains_emitted(), 2);
    }

    #[test]
    fn router_controls_a_bound_player() {
        let mut engine = engine();
        let player = engine.add_player(seeded());
        engine.bind("audio-player", player);
        engine
            .with_node(player, |player, _| {
                player.set_buffer(AudioBuffer::from_mono(vec![1.0; 2_000], 1_000).shared());
            })
            .unwrap();

        let update = ParameterUpdate::new()
            .with("audio-player:period", 0.2)
            .with("audio-player:control", "start");
        let report = engine.apply_update(&update);
        assert!(report.is_clean());

        let callback = engine.graph().get(player).unwrap().callback_id();
        assert_eq!(engine.scheduler.next_time(callback), Some(0.0));

        engine.apply_update(&ParameterUpdate::new().with("audio-player:control", "stop"));
        assert_eq!(engine.scheduler.next_time(callback), Some(f64::INFINITY));
    }

    #[test]
    fn bind_publishes_the_schema() {
        let mut engine = engine();
        let bus = engine.add_node(AudioBus::default());
        engine.bind("mix", bus);

        assert!(engine.is_bound("mix"));
        assert!(engine.schema().get("mix:volume").is_some());
        assert!(engine.schema().get("mix:mute").is_some());
    }

    #[test]
    fn removing_a_player_parks_its_callback() {
        let mut engine = engine();
        let player = engine.add_player(seeded());
        let callback = engine.graph().get(player).unwrap().callback_id();
        engine.remove_node(player.id()).unwrap();

        assert_eq!(engine.scheduler.next_time(callback), Some(f64::INFINITY));
        let mut out = vec![0.0; 100];
        engine.render_block(&mut out);
    }

    #[test]
    fn player_without_buffer_keeps_retrying() {
        let mut engine = engine();
        let player = engine.add_player(seeded());
        let callback = engine.graph().get(player).unwrap().callback_id();
        engine.scheduler.reset(callback, 0.0);

        let mut out = vec![0.0; 100];
        engine.render_block(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
        let next = engine.scheduler.next_time(callback).unwrap();
        assert!(next.is_finite() && next >= 0.1);
    }
}
