//! Configuration types for parsing and audio export.

use serde::{Deserialize, Serialize};

/// Sample rate used when exporting mixed audio.
fn default_sample_rate() -> u32 {
    32768
}

/// Frame rate assumed when the stored speed code is outside the table.
fn default_fallback_framerate() -> f32 {
    30.0
}

/// Top-level codec configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Container parsing options.
    #[serde(default)]
    pub parse: ParseConfig,
    /// Audio decode and mix options.
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Options for [`Container::parse_with`](crate::Container::parse_with).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Worker threads for frame decoding (0 = one per core).
    #[serde(default)]
    pub worker_threads: usize,
}

/// Options for PCM export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Frames per second used when the container does not name a valid speed.
    #[serde(default = "default_fallback_framerate")]
    pub fallback_framerate: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            fallback_framerate: default_fallback_framerate(),
        }
    }
}

impl CodecConfig {
    /// Load and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.audio.validate()
    }
}

impl AudioConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if !(self.fallback_framerate > 0.0) {
            return Err(ConfigError::InvalidFramerate(self.fallback_framerate));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Sample rate must be non-zero")]
    InvalidSampleRate,
    #[error("Fallback frame rate must be positive, got {0}")]
    InvalidFramerate(f32),
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}
