//! TCP delivery server that streams transcript updates to subscribers.
//!
//! Every subscriber connection runs its own task with an independent cursor
//! into the broadcast queue, so a slow or dead subscriber never delays the
//! pipeline driver or anyone else. The wire protocol is UTF-8 lines: a
//! one-time greeting, then one JSON [`LineUpdate`] per line.

use crate::broadcast::{BroadcastQueue, Cursor, LineUpdate, QueueEvent};
use crate::defaults;
use crate::error::{Result, VocastError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// How long the accept loop waits before re-checking the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Push server for live transcript subscribers.
pub struct DeliveryServer {
    listener: TcpListener,
    greeting: String,
    subscriber_wait: Duration,
}

impl DeliveryServer {
    /// Binds the listening address.
    ///
    /// Failure here is fatal at startup; it is the only delivery error that
    /// propagates.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| VocastError::ServerBind {
                addr: addr.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            listener,
            greeting: defaults::GREETING.to_string(),
            subscriber_wait: defaults::SUBSCRIBER_WAIT,
        })
    }

    /// Sets the greeting sent on connect.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Sets how long each subscriber loop waits for the next update before
    /// re-checking its connection.
    pub fn with_subscriber_wait(mut self, wait: Duration) -> Self {
        self.subscriber_wait = wait;
        self
    }

    /// The bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts subscribers until the shutdown flag flips.
    ///
    /// Each accepted connection is served on its own task; connection errors
    /// tear down only that subscriber.
    pub async fn serve(self, queue: BroadcastQueue, shutdown: watch::Receiver<bool>) -> Result<()> {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match tokio::time::timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    tracing::info!(%peer, "subscriber connected");
                    let cursor = queue.subscribe();
                    let greeting = self.greeting.clone();
                    let wait = self.subscriber_wait;
                    let shutdown = shutdown.clone();

                    tokio::spawn(async move {
                        match serve_subscriber(stream, cursor, &greeting, wait, shutdown).await {
                            Ok(()) => tracing::info!(%peer, "subscriber disconnected"),
                            Err(e) => tracing::debug!(%peer, error = %e, "subscriber dropped"),
                        }
                    });
                }
                Ok(Err(e)) => {
                    // A failed handshake (e.g. the client reset before accept
                    // completed) affects only that would-be subscriber; the
                    // bind failure in `bind` is the sole fatal server error.
                    tracing::warn!(error = %e, "failed to accept connection");
                }
                Err(_) => {
                    // Timeout - check shutdown flag again
                    continue;
                }
            }
        }

        tracing::debug!("delivery server stopped");
        Ok(())
    }
}

/// Serves one subscriber until its connection breaks, the queue closes, or
/// shutdown is requested.
async fn serve_subscriber(
    mut stream: TcpStream,
    mut cursor: Cursor,
    greeting: &str,
    wait: Duration,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    send_line(&mut stream, greeting).await?;

    loop {
        if *shutdown.borrow() {
            break;
        }

        match cursor.wait_next(wait).await {
            QueueEvent::Update(update) => {
                let line = encode_update(&update)?;
                send_line(&mut stream, &line).await?;
            }
            QueueEvent::TimedOut => {
                // Nothing queued; probe the socket so a subscriber that hung
                // up on an idle stream is reaped now rather than at the next
                // publish. Subscribers never send payload, so readable data
                // is either EOF or ignorable chatter.
                let mut probe = [0u8; 8];
                match stream.try_read(&mut probe) {
                    Ok(0) => break,
                    Ok(_) => continue,
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            QueueEvent::Closed => break,
        }
    }

    Ok(())
}

fn encode_update(update: &LineUpdate) -> Result<String> {
    serde_json::to_string(update).map_err(|e| VocastError::Delivery {
        message: format!("Failed to serialize update: {}", e),
    })
}

async fn send_line(stream: &mut TcpStream, line: &str) -> Result<()> {
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await?;
    stream.flush().await?;
    Ok(())
}
