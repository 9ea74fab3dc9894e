//! Command-line interface definitions.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;

/// Live speech transcription broadcast to TCP subscribers.
///
/// Reads raw 16-bit mono PCM from stdin (the capture collaborator),
/// segments it into phrases on silence gaps, transcribes each phrase, and
/// serves the growing transcript to subscribers as newline-delimited JSON.
#[derive(Debug, Parser)]
#[command(name = "vocast", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the ggml Whisper model
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Language code for transcription (e.g. "en")
    #[arg(short, long)]
    pub language: Option<String>,

    /// Address for the delivery server to listen on
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// Microphone energy threshold (pass-through for the capture side)
    #[arg(long)]
    pub energy_threshold: Option<u32>,

    /// Capture chunk cadence (e.g. "2s", "500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub record_timeout: Option<Duration>,

    /// Silence gap that starts a new transcript line (e.g. "3s")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub phrase_timeout: Option<Duration>,

    /// Use hardware-accelerated decoding if available
    #[arg(long)]
    pub gpu: bool,

    /// Suppress the live transcript console echo
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Applies command-line overrides on top of a loaded config.
    pub fn apply_to(&self, mut config: Config) -> Config {
        if let Some(model) = &self.model {
            config.stt.model = model.clone();
        }
        if let Some(language) = &self.language {
            config.stt.language = language.clone();
        }
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(threshold) = self.energy_threshold {
            config.audio.energy_threshold = threshold;
        }
        if let Some(timeout) = self.record_timeout {
            config.audio.record_timeout_secs = timeout.as_secs_f64();
        }
        if let Some(timeout) = self.phrase_timeout {
            config.audio.phrase_timeout_secs = timeout.as_secs_f64();
        }
        if self.gpu {
            config.stt.gpu = true;
        }
        config
    }
}
