use tracing::debug;

use crate::{
    engine::Engine,
    graph::{
        amplify::Gain,
        bus::AudioBus,
        delay::{DelayOptions, FeedbackDelay},
        distortion::Overdrive,
        granular::{GranularAudioPlayer, PlayerOptions},
        node::{NodeHandle, Sink},
        GraphError,
    },
};

/// The chain every thing runs:
///
/// ```text
/// player ─┬─→ wet ──→ feedbackDelay ──┐
///         └─→ dry ────────────────────┴─→ mix ──→ output
/// ```
///
/// Bound namespaces: `audio-player`, `mix`, `feedback-delay`.
#[derive(Debug, Clone, Copy)]
pub struct ThingChain {
    pub player: NodeHandle<GranularAudioPlayer>,
    pub wet: NodeHandle<Gain>,
    pub dry: NodeHandle<Gain>,
    pub delay: NodeHandle<FeedbackDelay>,
    pub mix: NodeHandle<AudioBus>,
}

impl ThingChain {
    pub const PLAYER: &'static str = "audio-player";
    pub const MIX: &'static str = "mix";
    pub const DELAY: &'static str = "feedback-delay";

    pub fn build(
        engine: &mut Engine,
        player: PlayerOptions,
        apply_fx: bool,
    ) -> Result<Self, GraphError> {
        let mix = engine.add_node(AudioBus::default());
        engine.connect(mix.id(), Sink::Output)?;

        let delay = engine.add_node(FeedbackDelay::new(
            engine.sample_rate(),
            DelayOptions::default(),
        ));
        engine.connect(delay.id(), mix)?;

        let wet = engine.add_node(Gain::new(if apply_fx { 1.0 } else { 0.0 }));
        engine.connect(wet.id(), delay)?;

        let dry = engine.add_node(Gain::new(if apply_fx { 0.0 } else { 1.0 }));
        engine.connect(dry.id(), mix)?;

        let player = engine.add_player(player);
        engine.connect(player.id(), wet)?;
        engine.connect(player.id(), dry)?;

        engine.bind(Self::PLAYER, player);
        engine.bind(Self::MIX, mix);
        engine.bind(Self::DELAY, delay);
        debug!(apply_fx, "thing chain built");

        Ok(Self {
            player,
            wet,
            dry,
            delay,
            mix,
        })
    }
}

/// The bench chain for auditioning a player through every effect:
///
/// ```text
/// player ──→ inputBus ──→ overdrive ─┬─→ feedbackDelay ──┐
///                                    └───────────────────┴─→ master ──→ output
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PlayerChain {
    pub player: NodeHandle<GranularAudioPlayer>,
    pub input_bus: NodeHandle<AudioBus>,
    pub overdrive: NodeHandle<Overdrive>,
    pub delay: NodeHandle<FeedbackDelay>,
    pub master: NodeHandle<AudioBus>,
}

impl PlayerChain {
    pub fn build(engine: &mut Engine, player: PlayerOptions) -> Result<Self, GraphError> {
        let master = engine.add_node(AudioBus::default());
        engine.connect(master.id(), Sink::Output)?;

        let delay = engine.add_node(FeedbackDelay::new(
            engine.sample_rate(),
            DelayOptions::default(),
        ));
        engine.connect(delay.id(), master)?;

        let overdrive = engine.add_node(Overdrive::new());
        engine.connect(overdrive.id(), delay)?;
        engine.connect(overdrive.id(), master)?;

        let input_bus = engine.add_node(AudioBus::default());
        engine.connect(input_bus.id(), overdrive)?;

        let player = engine.add_player(player);
        engine.connect(player.id(), input_bus)?;

        engine.bind("audio-player", player);
        engine.bind("input-bus", input_bus);
        engine.bind("overdrive", overdrive);
        engine.bind("feedback-delay", delay);
        engine.bind("master", master);

        Ok(Self {
            player,
            input_bus,
            overdrive,
            delay,
            master,
        })
    }
}
