//! Installation-level chains fed from a control queue.
//!
//! A [`Thing`] owns an [`Engine`](crate::Engine) on the audio thread and
//! drains a lock-free ring of [`ThingMessage`]s at the top of every block.
//! The network side holds the producing [`ThingHandle`].
//!
//! ```ignore
//! use grainfield::{runtime::{Thing, ThingMessage, ThingOptions}, control::ParameterUpdate};
//!
//! let (mut thing, mut handle) = Thing::new(EngineConfig::default(), ThingOptions::default())?;
//! handle.send(ThingMessage::Update(
//!     ParameterUpdate::new().with("audio-player:control", "start"),
//! ))?;
//! thing.process_block(&mut output);
//! ```

mod chain;
mod intro;
mod message;
mod thing;

pub use chain::{PlayerChain, ThingChain};
pub use intro::{IntroPlayer, IntroState};
pub use message::{control_queue, ThingHandle, ThingMessage};
pub use thing::{Lighting, Thing, ThingOptions, FX_CROSSFADE_TIME, TRIGGER_TIME_CONSTANT};
