//! Signal graph: nodes, their parameters, and the arena that renders them.
//!
//! Nodes wrap the low-level DSP primitives with what a live patch needs:
//! automatable parameters, sample-accurate start times, and remote control
//! through the router.

use thiserror::Error;

/// Plain gain stage.
pub mod amplify;
/// Volume and mute bus.
pub mod bus;
/// Feedback delay with a tone filter in the loop.
pub mod delay;
/// Level-compensated waveshaping overdrive.
pub mod distortion;
/// Scheduler-driven granular buffer player.
pub mod granular;
/// Core traits and handles shared by all graph nodes.
pub mod node;
/// Automatable parameter channels.
pub mod param;
/// The node arena and its render order.
pub mod patch;
/// One-shot and looping buffer playback.
pub mod source;

pub use amplify::Gain;
pub use bus::{AudioBus, BusOptions};
pub use delay::{DelayOptions, FeedbackDelay};
pub use distortion::Overdrive;
pub use granular::{Grain, GranularAudioPlayer, PlayerError, PlayerOptions};
pub use node::{NodeHandle, NodeId, RenderCtx, SignalNode, Sink};
pub use param::{AudioParam, CompensatedParam, DecibelParam, ParameterChannel};
pub use patch::SignalGraph;
pub use source::BufferSource;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("Node {0} is not of the requested type")]
    TypeMismatch(NodeId),

    #[error("Connecting {from} to {to} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },
}
