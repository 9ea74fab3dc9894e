//! Accumulates captured audio chunks into phrase-sized clips.
//!
//! The capture collaborator pushes chunks through an [`IngestHandle`] from its
//! own thread; the pipeline driver drains them through the [`Aggregator`]. The
//! two sides are connected by an unbounded channel, so `ingest` never blocks
//! no matter how far behind the driver is.

use crate::audio::{AudioChunk, AudioFormat};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::time::{Duration, Instant};

/// A clip of accumulated audio ready for transcription.
#[derive(Debug, Clone)]
pub struct Clip {
    /// The full working buffer at drain time.
    pub bytes: Vec<u8>,
    /// Format of the bytes.
    pub format: AudioFormat,
    /// True when a silence gap longer than the phrase timeout preceded this
    /// cycle's audio, i.e. the previous phrase is complete.
    pub is_boundary: bool,
}

/// Capture-side handle. Cheap to clone, safe to call from any thread.
#[derive(Debug, Clone)]
pub struct IngestHandle {
    tx: Sender<AudioChunk>,
}

impl IngestHandle {
    /// Queues a chunk for the driver. Never blocks and never fails; if the
    /// pipeline has shut down the chunk is silently dropped.
    pub fn ingest(&self, chunk: AudioChunk) {
        let _ = self.tx.send(chunk);
    }
}

/// Driver-side accumulator. Owns the working buffer exclusively, so phrase
/// state needs no locking beyond the ingest channel itself.
#[derive(Debug)]
pub struct Aggregator {
    rx: Receiver<AudioChunk>,
    working: Vec<u8>,
    format: AudioFormat,
    /// Last time a drain saw pending audio. None until the first clip, which
    /// is therefore never a boundary.
    last_audio_at: Option<Instant>,
}

/// Creates a connected ingest handle and aggregator pair.
pub fn aggregator() -> (IngestHandle, Aggregator) {
    let (tx, rx) = unbounded();
    (
        IngestHandle { tx },
        Aggregator {
            rx,
            working: Vec::new(),
            format: AudioFormat::default(),
            last_audio_at: None,
        },
    )
}

impl Aggregator {
    /// Returns true if chunks are waiting to be drained.
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Drains pending chunks into the working buffer and returns a clip.
    ///
    /// Returns `None` when no chunks are pending (idle cycle). Otherwise the
    /// clip holds the full accumulated buffer. If the elapsed time since the
    /// previous drain that saw audio exceeds `phrase_timeout`, the working
    /// buffer is first reset so the clip contains only this cycle's chunks and
    /// `is_boundary` is set.
    pub fn drain_if_boundary(&mut self, now: Instant, phrase_timeout: Duration) -> Option<Clip> {
        if self.rx.is_empty() {
            return None;
        }

        let is_boundary = self
            .last_audio_at
            .is_some_and(|t| now.duration_since(t) > phrase_timeout);

        if is_boundary {
            self.working.clear();
        }

        while let Ok(chunk) = self.rx.try_recv() {
            self.format = chunk.format;
            self.working.extend_from_slice(&chunk.bytes);
        }

        self.last_audio_at = Some(now);

        Some(Clip {
            bytes: self.working.clone(),
            format: self.format,
            is_boundary,
        })
    }
}
