//! Bounded fan-out queue between the pipeline driver and the delivery server.
//!
//! Built on `tokio::sync::broadcast`: every subscriber holds an independent
//! cursor into the published stream, publishing never blocks the driver, and a
//! subscriber that falls further behind than the ring capacity loses the
//! oldest unread updates rather than stalling anyone else. A cursor created
//! after a publish never sees that historical message.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;

/// Snapshot of one transcript line at publish time.
///
/// `index` is the line's position in the transcript log, so subscribers can
/// tell a replacement of the open line from a newly appended one. `open`
/// marks the line that may still be revised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineUpdate {
    pub index: usize,
    pub text: String,
    pub open: bool,
}

/// What a bounded wait on a cursor produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// The next in-order update.
    Update(LineUpdate),
    /// Nothing arrived within the wait; the caller should re-check its
    /// connection and loop.
    TimedOut,
    /// The publishing side is gone and everything buffered has been read.
    Closed,
}

/// Publish side of the fan-out queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BroadcastQueue {
    tx: broadcast::Sender<LineUpdate>,
}

impl BroadcastQueue {
    /// Creates a queue whose ring holds `capacity` unread updates per
    /// subscriber before the oldest are dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an update to every current subscriber.
    ///
    /// Never blocks. Returns the number of subscribers the update reached;
    /// zero when nobody is connected, which is not an error.
    pub fn publish(&self, update: LineUpdate) -> usize {
        self.tx.send(update).unwrap_or(0)
    }

    /// Opens an independent read position starting at the next publish.
    pub fn subscribe(&self) -> Cursor {
        Cursor {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of currently connected cursors.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One subscriber's read position into the published stream.
#[derive(Debug)]
pub struct Cursor {
    rx: broadcast::Receiver<LineUpdate>,
}

impl Cursor {
    /// Waits up to `wait` for the next update.
    ///
    /// Lag gaps (updates dropped because this cursor fell behind) are skipped
    /// silently; delivery resumes with the oldest update still buffered, in
    /// order.
    pub async fn wait_next(&mut self, wait: Duration) -> QueueEvent {
        loop {
            match tokio::time::timeout(wait, self.rx.recv()).await {
                Ok(Ok(update)) => return QueueEvent::Update(update),
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::debug!(skipped, "subscriber lagged, dropped oldest updates");
                    continue;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return QueueEvent::Closed,
                Err(_) => return QueueEvent::TimedOut,
            }
        }
    }
}
