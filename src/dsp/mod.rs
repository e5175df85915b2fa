//! Low-level DSP primitives used by the signal nodes.
//!
//! These components do not allocate while rendering and hold no graph
//! state, so a node can embed them directly. They stay focused on the
//! signal-processing math. Scheduling and routing live in `graph`.

/// Gain application and decibel conversion.
pub mod amplify;
/// Sample-accurate automation timeline behind every parameter channel.
pub mod automation;
/// Fractional delay line bounded by a maximum delay time.
pub mod delay;
/// Table waveshaper and the default soft-knee curve.
pub mod distortion;
/// State-variable low-pass used as the delay's tone filter.
pub mod filter;
/// Time-addressed, interpolating reader over decoded buffers.
pub mod playback;

pub use automation::{Automation, AutomationEvent};
