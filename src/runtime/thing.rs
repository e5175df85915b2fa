use std::collections::HashMap;

use rtrb::Consumer;
use tracing::{debug, info, warn};

use super::{
    chain::ThingChain,
    message::{control_queue, ThingHandle, ThingMessage},
};
use crate::{
    config::EngineConfig,
    control::{router::ParameterUpdate, ParamValue},
    dsp::amplify::db_to_linear,
    engine::Engine,
    graph::{
        amplify::Gain, granular::PlayerOptions, node::NodeHandle, param::ParameterChannel,
        source::BufferSource,
    },
    io::{AudioOutput, SharedBuffer},
};

/// Smoothing of per-trigger volume changes, in seconds.
pub const TRIGGER_TIME_CONSTANT: f64 = 0.03;
/// Length of the dry/wet crossfade on `applyFx`, in seconds.
pub const FX_CROSSFADE_TIME: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default)]
pub struct ThingOptions {
    pub player: PlayerOptions,
    /// Start with the player routed through the delay.
    pub apply_fx: bool,
}

/// Lighting state carried by the global `ledBaseColor` and
/// `ledIntensityFactor` keys. The LED driver reads it; the engine does not.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    /// CSS-style hex color, e.g. `#1100fa`.
    pub base_color: String,
    /// Scales the audio-following brightness, in `[0, 1]`.
    pub intensity_factor: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            base_color: "#1100fa".into(),
            intensity_factor: 0.1,
        }
    }
}

/// One sounding thing: the [`ThingChain`] plus its thing-level controls.
///
/// Keys without a namespace are handled here (`applyFx`), everything else
/// goes through the engine's router. Trigger files get one gain per url,
/// created on first use and kept for later volume changes.
pub struct Thing {
    engine: Engine,
    chain: ThingChain,
    rx: Consumer<ThingMessage>,
    triggers: HashMap<String, NodeHandle<Gain>>,
    apply_fx: bool,
    loaded: bool,
    lighting: Lighting,
}

impl Thing {
    pub fn new(config: EngineConfig, options: ThingOptions) -> crate::Result<(Self, ThingHandle)> {
        let capacity = config.control_queue_capacity;
        let mut engine = Engine::new(config)?;
        let chain = ThingChain::build(&mut engine, options.player, options.apply_fx)?;
        let (handle, rx) = control_queue(capacity);

        let thing = Self {
            engine,
            chain,
            rx,
            triggers: HashMap::new(),
            apply_fx: options.apply_fx,
            loaded: false,
            lighting: Lighting::default(),
        };
        Ok((thing, handle))
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn chain(&self) -> &ThingChain {
        &self.chain
    }

    /// Whether the player has a sound file.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn fx_applied(&self) -> bool {
        self.apply_fx
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn trigger_gain(&self, url: &str) -> Option<NodeHandle<Gain>> {
        self.triggers.get(url).copied()
    }

    /// Drain the control queue, then render one block.
    pub fn process_block(&mut self, output: &mut AudioOutput) {
        self.drain();
        self.engine.process_block(output);
    }

    /// Drain the control queue, then render mono into `out`.
    pub fn render_block(&mut self, out: &mut [f32]) {
        self.drain();
        self.engine.render_block(out);
    }

    fn drain(&mut self) {
        while let Ok(message) = self.rx.pop() {
            if let Err(err) = self.handle(message) {
                warn!(error = %err, "control message failed");
            }
        }
    }

    /// Apply one message at the current logical time.
    pub fn handle(&mut self, message: ThingMessage) -> crate::Result<()> {
        match message {
            ThingMessage::Update(update) => self.update(update),
            ThingMessage::Soundfile {
                buffer,
                play_on_load,
            } => self.set_soundfile(buffer, play_on_load),
            ThingMessage::TriggerFile {
                url,
                buffer,
                volume_db,
            } => self.trigger_file(url, buffer, volume_db),
            ThingMessage::TriggerVolume { url, volume_db } => {
                self.trigger_volume(url, volume_db)?;
                Ok(())
            }
        }
    }

    fn update(&mut self, mut update: ParameterUpdate) -> crate::Result<()> {
        let local = update.extract(|key| !key.contains(':'));
        for (key, value) in local {
            match (key.as_str(), &value) {
                ("applyFx", ParamValue::Bool(enabled)) => self.set_apply_fx(*enabled)?,
                ("ledBaseColor", ParamValue::Text(color)) => {
                    self.lighting.base_color = color.to_string();
                }
                ("ledIntensityFactor", ParamValue::Int(_) | ParamValue::Float(_)) => {
                    let factor = value.as_f64().map_or(0.0, |v| v.clamp(0.0, 1.0));
                    self.lighting.intensity_factor = factor as f32;
                }
                _ => debug!(%key, "thing key without a handler"),
            }
        }

        if !update.is_empty() {
            self.engine.apply_update(&update);
        }
        Ok(())
    }

    fn set_soundfile(&mut self, buffer: SharedBuffer, play_on_load: bool) -> crate::Result<()> {
        let seconds = buffer.duration();
        self.engine.with_node(self.chain.player, |player, ctx| {
            player.set_buffer(buffer);
            if play_on_load {
                player.start(ctx.scheduler);
            }
        })?;
        self.loaded = true;
        info!(seconds, play_on_load, "soundfile loaded");
        Ok(())
    }

    /// Crossfade between the dry and wet sends over [`FX_CROSSFADE_TIME`].
    ///
    /// Each send ramps from where it currently is, so repeating the same
    /// value holds the levels.
    pub fn set_apply_fx(&mut self, enabled: bool) -> crate::Result<()> {
        let now = self.engine.now();
        let (dry_to, wet_to) = if enabled { (0.0, 1.0) } else { (1.0, 0.0) };

        let graph = self.engine.graph_mut();
        for (send, target) in [(self.chain.dry, dry_to), (self.chain.wet, wet_to)] {
            let gain = graph.get_mut(send)?.gain_mut();
            let from = gain.value_at(now);
            gain.cancel_scheduled_values(now);
            gain.set_value_at_time(from, now);
            gain.linear_ramp_to_value_at_time(target, now + FX_CROSSFADE_TIME);
        }

        self.apply_fx = enabled;
        debug!(enabled, now, "fx crossfade");
        Ok(())
    }

    fn trigger_file(&mut self, url: String, buffer: SharedBuffer, volume_db: f32) -> crate::Result<()> {
        let now = self.engine.now();
        let gain = self.trigger_volume(url, volume_db)?;

        let mut source = BufferSource::new(buffer);
        source.start(now, 0.0);
        let source = self.engine.add_node(source);
        self.engine.connect(source.id(), gain)?;
        Ok(())
    }

    /// Smooth the url's gain toward `volume_db`, creating it at that level
    /// if it does not exist yet.
    fn trigger_volume(&mut self, url: String, volume_db: f32) -> crate::Result<NodeHandle<Gain>> {
        let level = db_to_linear(volume_db);
        let now = self.engine.now();

        if let Some(&gain) = self.triggers.get(&url) {
            self.engine
                .graph_mut()
                .get_mut(gain)?
                .gain_mut()
                .set_target_at_time(level, now, TRIGGER_TIME_CONSTANT);
            return Ok(gain);
        }

        let gain = self.engine.add_node(Gain::new(level));
        self.engine.connect(gain.id(), self.chain.mix)?;
        debug!(%url, volume_db, "trigger gain created");
        self.triggers.insert(url, gain);
        Ok(gain)
    }
}
