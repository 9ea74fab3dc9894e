//! Audio chunk types and the phrase-boundary aggregator.

pub mod aggregator;

pub use aggregator::{Aggregator, Clip, IngestHandle, aggregator};

use crate::defaults;

/// PCM format metadata carried with every chunk and clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bytes per sample (2 for 16-bit PCM).
    pub sample_width: u16,
}

impl AudioFormat {
    /// Creates a new audio format.
    pub fn new(sample_rate: u32, sample_width: u16) -> Self {
        Self {
            sample_rate,
            sample_width,
        }
    }

    /// Raw byte throughput of a mono stream in this format.
    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * self.sample_width as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            sample_width: defaults::SAMPLE_WIDTH,
        }
    }
}

/// A slice of raw captured audio, immutable after creation.
///
/// Produced by the capture collaborator at irregular intervals; ownership
/// transfers to the aggregator on ingest.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw PCM bytes.
    pub bytes: Vec<u8>,
    /// Format of the bytes.
    pub format: AudioFormat,
}

impl AudioChunk {
    /// Creates a new audio chunk.
    pub fn new(bytes: Vec<u8>, format: AudioFormat) -> Self {
        Self { bytes, format }
    }
}
