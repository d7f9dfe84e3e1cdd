//! Runtime configuration

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_VOICES: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("voices must be at least 1")]
    NoVoices,
    #[error("stop-after must be greater than zero")]
    ZeroStopAfter,
}

/// Settings for one run of the click loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of player voices used round-robin
    pub voices: usize,
    /// Ring the terminal bell on every click
    pub bell: bool,
    /// Stop on our own after this long, as if interrupted
    pub stop_after: Option<Duration>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voices == 0 {
            return Err(ConfigError::NoVoices);
        }
        if self.stop_after.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroStopAfter);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voices: DEFAULT_VOICES,
            bell: false,
            stop_after: None,
        }
    }
}
