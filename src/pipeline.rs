//! Pipeline driver: the coordinating loop.
//!
//! Each cycle pulls accumulated audio from the aggregator, transcribes it on
//! the blocking thread pool, updates the transcript log (append on a phrase
//! boundary, revise otherwise), and publishes the full snapshot to the
//! broadcast queue. Transcription failures lose that cycle's text, never the
//! pipeline.

use crate::audio::{Aggregator, Clip};
use crate::broadcast::{BroadcastQueue, LineUpdate};
use crate::defaults;
use crate::stt::TranscriptionEngine;
use crate::transcript::TranscriptLog;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Configuration for the pipeline driver.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Silence gap that closes a phrase.
    pub phrase_timeout: Duration,
    /// Sleep between cycles; rate-limits engine invocations.
    pub poll_interval: Duration,
    /// Clear and reprint the transcript on the console after every update.
    pub echo_transcript: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            phrase_timeout: defaults::PHRASE_TIMEOUT,
            poll_interval: defaults::POLL_INTERVAL,
            echo_transcript: false,
        }
    }
}

/// What a single driver cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No audio was pending.
    Idle,
    /// The log was updated and the snapshot published.
    Published {
        /// True when a new line was opened rather than the last one revised.
        boundary: bool,
    },
    /// The engine failed; the log was left untouched.
    TranscriptionFailed,
}

/// The coordinating loop between capture, transcription, and delivery.
pub struct PipelineDriver<E> {
    aggregator: Aggregator,
    engine: Arc<E>,
    log: TranscriptLog,
    queue: BroadcastQueue,
    config: PipelineConfig,
    /// A declared boundary survives a failed transcription so the next
    /// successful cycle still opens a new line.
    boundary_pending: bool,
}

impl<E: TranscriptionEngine + 'static> PipelineDriver<E> {
    /// Creates a driver over the given aggregator, engine, and queue.
    pub fn new(
        aggregator: Aggregator,
        engine: Arc<E>,
        queue: BroadcastQueue,
        config: PipelineConfig,
    ) -> Self {
        Self {
            aggregator,
            engine,
            log: TranscriptLog::new(),
            queue,
            config,
            boundary_pending: false,
        }
    }

    /// The transcript built so far.
    pub fn transcript(&self) -> &TranscriptLog {
        &self.log
    }

    /// Runs one cycle: drain, transcribe, update, publish.
    ///
    /// `now` drives the boundary decision; the run loop passes
    /// `Instant::now()`.
    pub async fn run_cycle(&mut self, now: Instant) -> CycleOutcome {
        let Some(clip) = self
            .aggregator
            .drain_if_boundary(now, self.config.phrase_timeout)
        else {
            return CycleOutcome::Idle;
        };

        if clip.is_boundary {
            self.boundary_pending = true;
        }

        let engine = Arc::clone(&self.engine);
        let Clip { bytes, format, .. } = clip;
        let result = tokio::task::spawn_blocking(move || engine.transcribe(&bytes, format)).await;

        let text = match result {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "transcription failed, skipping cycle");
                return CycleOutcome::TranscriptionFailed;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription task panicked, skipping cycle");
                return CycleOutcome::TranscriptionFailed;
            }
        };

        let text = text.trim().to_string();
        let boundary = self.boundary_pending && !self.log.is_empty();
        if boundary {
            self.log.append_new(text);
        } else {
            self.log.revise_last(text);
        }
        self.boundary_pending = false;

        self.publish_snapshot();

        if self.config.echo_transcript {
            self.echo();
        }

        CycleOutcome::Published { boundary }
    }

    /// Publishes every line of the current snapshot, not just the changed
    /// one, so late subscribers converge on the full transcript.
    fn publish_snapshot(&self) {
        let lines = self.log.snapshot();
        let last = lines.len().saturating_sub(1);
        for line in lines {
            let open = line.index == last;
            self.queue.publish(LineUpdate {
                index: line.index,
                text: line.text,
                open,
            });
        }
    }

    /// Clears the console and reprints the whole transcript.
    fn echo(&self) {
        print!("\x1b[2J\x1b[1;1H");
        println!("{}", self.log.render());
        let _ = std::io::stdout().flush();
    }

    /// Runs cycles until the shutdown flag flips, then returns the final
    /// transcript.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> TranscriptLog {
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_cycle(Instant::now()).await;

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        tracing::info!(lines = self.log.len(), "pipeline stopped");
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioChunk, AudioFormat, IngestHandle, aggregator};
    use crate::broadcast::QueueEvent;
    use crate::stt::MockEngine;

    const WAIT: Duration = Duration::from_millis(50);

    fn driver_with(
        engine: MockEngine,
    ) -> (IngestHandle, PipelineDriver<MockEngine>, BroadcastQueue) {
        let (handle, agg) = aggregator();
        let queue = BroadcastQueue::new(64);
        let driver = PipelineDriver::new(
            agg,
            Arc::new(engine),
            queue.clone(),
            PipelineConfig::default(),
        );
        (handle, driver, queue)
    }

    fn ingest(handle: &IngestHandle, bytes: &[u8]) {
        handle.ingest(AudioChunk::new(bytes.to_vec(), AudioFormat::default()));
    }

    #[tokio::test]
    async fn test_idle_cycle_with_no_audio() {
        let (_handle, mut driver, _queue) = driver_with(MockEngine::new("m"));
        let outcome = driver.run_cycle(Instant::now()).await;
        assert_eq!(outcome, CycleOutcome::Idle);
        assert!(driver.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_first_cycle_creates_first_line() {
        let (handle, mut driver, _queue) = driver_with(MockEngine::new("m").with_response("hello"));

        ingest(&handle, b"aaaa");
        let outcome = driver.run_cycle(Instant::now()).await;

        assert_eq!(outcome, CycleOutcome::Published { boundary: false });
        let snapshot = driver.transcript().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text, "hello");
    }

    #[tokio::test]
    async fn test_boundary_opens_new_line() {
        let (handle, mut driver, _queue) = driver_with(MockEngine::new("m").with_response("text"));
        let base = Instant::now();

        ingest(&handle, b"aaaa");
        driver.run_cycle(base).await;

        ingest(&handle, b"bbbb");
        let outcome = driver.run_cycle(base + Duration::from_secs(5)).await;

        assert_eq!(outcome, CycleOutcome::Published { boundary: true });
        assert_eq!(driver.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_no_boundary_revises_last_line() {
        let (handle, mut driver, _queue) = driver_with(MockEngine::new("m").with_response("text"));
        let base = Instant::now();

        ingest(&handle, b"aaaa");
        driver.run_cycle(base).await;

        ingest(&handle, b"bbbb");
        let outcome = driver.run_cycle(base + Duration::from_secs(1)).await;

        assert_eq!(outcome, CycleOutcome::Published { boundary: false });
        assert_eq!(driver.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_cycle_leaves_log_untouched() {
        let (handle, mut driver, _queue) = driver_with(MockEngine::new("m").with_failure());

        ingest(&handle, b"aaaa");
        let outcome = driver.run_cycle(Instant::now()).await;

        assert_eq!(outcome, CycleOutcome::TranscriptionFailed);
        assert!(driver.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_published_text_is_trimmed() {
        let (handle, mut driver, _queue) =
            driver_with(MockEngine::new("m").with_response("  padded  "));

        ingest(&handle, b"aaaa");
        driver.run_cycle(Instant::now()).await;

        assert_eq!(driver.transcript().snapshot()[0].text, "padded");
    }

    #[tokio::test]
    async fn test_full_snapshot_is_published_every_cycle() {
        let (handle, mut driver, queue) = driver_with(MockEngine::new("m").with_response("text"));
        let mut cursor = queue.subscribe();
        let base = Instant::now();

        ingest(&handle, b"aaaa");
        driver.run_cycle(base).await;

        ingest(&handle, b"bbbb");
        driver.run_cycle(base + Duration::from_secs(5)).await;

        // Cycle 1 published one line; cycle 2 republished line 0 and the new
        // line 1.
        let mut updates = Vec::new();
        while let QueueEvent::Update(u) = cursor.wait_next(WAIT).await {
            updates.push(u);
        }

        let indices: Vec<usize> = updates.iter().map(|u| u.index).collect();
        assert_eq!(indices, vec![0, 0, 1]);
        assert!(!updates[1].open, "closed line republished as closed");
        assert!(updates[2].open, "only the last line is open");
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let (handle, driver, _queue) = driver_with(MockEngine::new("m").with_response("line"));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        ingest(&handle, b"aaaa");
        let task = tokio::spawn(driver.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let log = task.await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.snapshot()[0].text, "line");
    }
}
