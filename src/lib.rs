pub mod config;
pub mod control; // Parameter schema and remote update routing
pub mod dsp;
pub mod engine; // Scheduler, clocks and the per-block driver
pub mod error;
pub mod graph; // Signal nodes and routing
pub mod io;
#[cfg(feature = "rtrb")]
pub mod runtime; // Installation-level chains fed from a control queue

pub use config::{EngineConfig, SchedulerConfig};
pub use engine::Engine;
pub use error::{Error, Result};

pub const MAX_BLOCK_SIZE: usize = 2048;
