//! vocast - live speech transcription broadcast
//!
//! Captures a live audio stream, segments it into phrases on silence gaps,
//! transcribes each phrase, and pushes the growing transcript to any number
//! of TCP subscribers.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod broadcast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod stt;
pub mod transcript;

// Core types (capture → transcribe → broadcast)
pub use audio::{Aggregator, AudioChunk, AudioFormat, Clip, IngestHandle, aggregator};
pub use broadcast::{BroadcastQueue, Cursor, LineUpdate, QueueEvent};
pub use pipeline::{CycleOutcome, PipelineConfig, PipelineDriver};
pub use server::DeliveryServer;
pub use stt::TranscriptionEngine;
pub use transcript::{TranscriptLine, TranscriptLog};

// Error handling
pub use error::{Result, VocastError};

// Config
pub use config::Config;
