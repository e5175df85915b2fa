//! Engine configuration.
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! sample_rate = 44100.0
//! block_size = 256
//!
//! [scheduler]
//! lookahead = 0.1
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::MAX_BLOCK_SIZE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Timing of the logical-time callback scheduler.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// How far past the end of the current block callbacks are run, in seconds.
    pub lookahead: f64,
    /// Delay before a failed callback is tried again, in seconds.
    pub retry_interval: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead: 0.05,
            retry_interval: 0.05,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Frames rendered per `process_block` call when the output has no buffers yet.
    pub block_size: usize,
    pub channels: usize,
    /// Capacity of the control ring between the network side and the audio thread.
    pub control_queue_capacity: usize,
    /// Lead time added to the shared clock when scheduling a synchronized start.
    pub sync_lead: f64,
    pub scheduler: SchedulerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 512,
            channels: 2,
            control_queue_capacity: 256,
            sync_lead: 1.0,
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Lowest accepted rate, low enough for control-rate offline renders.
pub const MIN_SAMPLE_RATE: f32 = 1_000.0;
pub const MAX_SAMPLE_RATE: f32 = 384_000.0;

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(ConfigError::Invalid(format!(
                "sample_rate {} out of range ({MIN_SAMPLE_RATE}-{MAX_SAMPLE_RATE} Hz)",
                self.sample_rate
            )));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "block_size {} out of range (1-{MAX_BLOCK_SIZE})",
                self.block_size
            )));
        }
        if self.channels == 0 {
            return Err(ConfigError::Invalid("channels must be at least 1".into()));
        }
        if self.control_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "control_queue_capacity must be at least 1".into(),
            ));
        }
        if !(self.sync_lead >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "sync_lead {} must be non-negative",
                self.sync_lead
            )));
        }
        if !(self.scheduler.lookahead >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scheduler.lookahead {} must be non-negative",
                self.scheduler.lookahead
            )));
        }
        if !(self.scheduler.retry_interval > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scheduler.retry_interval {} must be positive",
                self.scheduler.retry_interval
            )));
        }
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
