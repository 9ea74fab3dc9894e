use crate::defaults;
use crate::error::{Result, VocastError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub server: ServerConfig,
}

/// Audio capture and segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub sample_width: u16,
    /// Pass-through for the capture collaborator's silence detection.
    pub energy_threshold: u32,
    /// Capture chunk cadence in seconds.
    pub record_timeout_secs: f64,
    /// Silence gap in seconds before a new transcript line starts.
    pub phrase_timeout_secs: f64,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    /// Path to the ggml model file.
    pub model: PathBuf,
    pub language: String,
    /// Hint for hardware-accelerated decoding.
    pub gpu: bool,
}

/// Delivery server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub subscriber_wait_ms: u64,
    pub queue_capacity: usize,
    pub greeting: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            sample_width: defaults::SAMPLE_WIDTH,
            energy_threshold: defaults::ENERGY_THRESHOLD,
            record_timeout_secs: defaults::RECORD_TIMEOUT.as_secs_f64(),
            phrase_timeout_secs: defaults::PHRASE_TIMEOUT.as_secs_f64(),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from(defaults::MODEL_PATH),
            language: defaults::LANGUAGE.to_string(),
            gpu: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: defaults::LISTEN_ADDR.to_string(),
            subscriber_wait_ms: defaults::SUBSCRIBER_WAIT.as_millis() as u64,
            queue_capacity: defaults::QUEUE_CAPACITY,
            greeting: defaults::GREETING.to_string(),
        }
    }
}

impl AudioConfig {
    pub fn record_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.record_timeout_secs)
    }

    pub fn phrase_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.phrase_timeout_secs)
    }
}

impl ServerConfig {
    pub fn subscriber_wait(&self) -> Duration {
        Duration::from_millis(self.subscriber_wait_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(VocastError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOCAST_MODEL → stt.model
    /// - VOCAST_LANGUAGE → stt.language
    /// - VOCAST_LISTEN → server.listen
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VOCAST_MODEL")
            && !model.is_empty()
        {
            self.stt.model = PathBuf::from(model);
        }

        if let Ok(language) = std::env::var("VOCAST_LANGUAGE")
            && !language.is_empty()
        {
            self.stt.language = language;
        }

        if let Ok(listen) = std::env::var("VOCAST_LISTEN")
            && !listen.is_empty()
        {
            self.server.listen = listen;
        }

        self
    }

    /// Validate values that would break the pipeline at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.audio.phrase_timeout_secs <= 0.0 {
            return Err(VocastError::ConfigInvalidValue {
                key: "audio.phrase_timeout_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.record_timeout_secs <= 0.0 {
            return Err(VocastError::ConfigInvalidValue {
                key: "audio.record_timeout_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.sample_width == 0 {
            return Err(VocastError::ConfigInvalidValue {
                key: "audio.sample_width".to_string(),
                message: "must be at least 1 byte".to_string(),
            });
        }
        if self.server.queue_capacity == 0 {
            return Err(VocastError::ConfigInvalidValue {
                key: "server.queue_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
