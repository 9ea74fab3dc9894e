//! Default configuration constants for vocast.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

use std::time::Duration;

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default sample width in bytes (16-bit signed PCM).
pub const SAMPLE_WIDTH: u16 = 2;

/// Default microphone energy threshold.
///
/// Pass-through value for the capture collaborator; audio below this level
/// is treated as silence on the capture side and never reaches the pipeline.
pub const ENERGY_THRESHOLD: u32 = 1000;

/// Default capture chunk cadence.
///
/// The capture side delivers raw audio in slices of roughly this duration.
/// Shorter values make the live transcript update more often at the cost of
/// more transcription calls.
pub const RECORD_TIMEOUT: Duration = Duration::from_secs(2);

/// Default silence gap that closes a phrase.
///
/// When no audio arrives for longer than this, the current transcript line is
/// frozen and the next audio starts a new one.
pub const PHRASE_TIMEOUT: Duration = Duration::from_secs(3);

/// Driver cycle sleep between polls of the audio queue.
///
/// Rate-limits transcription engine invocations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How long a subscriber loop waits for the next queued update before
/// re-checking for disconnection or shutdown.
pub const SUBSCRIBER_WAIT: Duration = Duration::from_secs(1);

/// Capacity of the broadcast ring. Slow subscribers that fall further behind
/// than this lose the oldest unread updates.
pub const QUEUE_CAPACITY: usize = 256;

/// Default listen address for the delivery server.
pub const LISTEN_ADDR: &str = "127.0.0.1:8766";

/// Greeting sent to every subscriber on connect, before any transcript lines.
pub const GREETING: &str = "Hello, client!";

/// Default Whisper model path.
pub const MODEL_PATH: &str = "models/ggml-small.en.bin";

/// Default language code for transcription.
pub const LANGUAGE: &str = "en";
