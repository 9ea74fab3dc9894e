//! Speech-to-text adapters.

pub mod engine;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use engine::{MockEngine, TranscriptionEngine};
#[cfg(feature = "whisper")]
pub use whisper::{WhisperEngine, WhisperEngineConfig};
