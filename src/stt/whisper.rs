//! Whisper-based transcription engine.
//!
//! This module provides a Whisper implementation of the TranscriptionEngine
//! trait using whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::audio::AudioFormat;
use crate::defaults;
use crate::error::{Result, VocastError};
use crate::stt::engine::TranscriptionEngine;
use std::path::PathBuf;
use std::sync::{Mutex, Once};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper engine.
#[derive(Debug, Clone)]
pub struct WhisperEngineConfig {
    /// Path to the ggml model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en", "es", "fr")
    pub language: String,
    /// Hint for hardware-accelerated decoding
    pub use_gpu: bool,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperEngineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::MODEL_PATH),
            language: defaults::LANGUAGE.to_string(),
            use_gpu: false,
            threads: None,
        }
    }
}

/// Whisper-based transcription engine.
///
/// The WhisperContext is wrapped in a Mutex to ensure thread safety; one
/// transcription runs at a time, which matches the pipeline driver's one
/// clip per cycle.
pub struct WhisperEngine {
    context: Mutex<WhisperContext>,
    config: WhisperEngineConfig,
    model_name: String,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

impl WhisperEngine {
    /// Create a new Whisper engine.
    ///
    /// # Errors
    /// Returns `VocastError::TranscriptionModelNotFound` if the model file
    /// doesn't exist, `VocastError::TranscriptionInferenceFailed` if loading
    /// fails.
    pub fn new(config: WhisperEngineConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(VocastError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut context_params = WhisperContextParameters::default();
        context_params.use_gpu(config.use_gpu);
        let context = WhisperContext::new_with_params(
            config.model_path.to_str().ok_or_else(|| {
                VocastError::TranscriptionInferenceFailed {
                    message: "Invalid UTF-8 in model path".to_string(),
                }
            })?,
            context_params,
        )
        .map_err(|e| VocastError::TranscriptionInferenceFailed {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperEngineConfig {
        &self.config
    }

    /// Convert 16-bit little-endian PCM bytes to f32 normalized to [-1.0, 1.0]
    ///
    /// Whisper expects audio as f32 in that range; a trailing odd byte is
    /// ignored.
    fn convert_pcm(pcm: &[u8]) -> Vec<f32> {
        pcm.chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect()
    }
}

impl TranscriptionEngine for WhisperEngine {
    fn transcribe(&self, pcm: &[u8], format: AudioFormat) -> Result<String> {
        // Degenerate clips transcribe to nothing.
        if pcm.len() < 2 {
            return Ok(String::new());
        }

        if format.sample_rate != defaults::SAMPLE_RATE || format.sample_width != 2 {
            return Err(VocastError::Transcription {
                message: format!(
                    "Whisper requires 16kHz 16-bit mono audio, got {}Hz {}-byte samples",
                    format.sample_rate, format.sample_width
                ),
            });
        }

        let samples = Self::convert_pcm(pcm);

        let context =
            self.context
                .lock()
                .map_err(|e| VocastError::TranscriptionInferenceFailed {
                    message: format!("Failed to acquire context lock: {}", e),
                })?;

        let mut state =
            context
                .create_state()
                .map_err(|e| VocastError::TranscriptionInferenceFailed {
                    message: format!("Failed to create Whisper state: {}", e),
                })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.config.language));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        // Disable printing to stdout/stderr
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| VocastError::TranscriptionInferenceFailed {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut text = String::new();
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
        }

        Ok(text.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}
