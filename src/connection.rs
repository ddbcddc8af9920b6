//! Connection manager — one shared event-stream connection, multiplexed by channel
//!
//! Owns the transport and its lifecycle:
//!
//! ```text
//! Disconnected --connect()--> Connecting --ok--> Connected
//!      ^                          |                  |
//!      +------ fail/close --------+------------------+
//!              (retry after a fixed delay while failures < max)
//! ```
//!
//! Inbound frames are parsed once here and dispatched to the
//! `SubscriptionRegistry`. Reconnects use a fixed delay and a bounded count
//! of consecutive failures; a successful connection resets the count.

use crate::error::{AuditError, Result};
use crate::provider::{AuditProvider, Connection};
use crate::registry::SubscriptionRegistry;
use crate::types::{ConnectionState, InboundMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// Reconnect policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    /// Consecutive failed attempts before giving up
    pub max_reconnect_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 3000,
        }
    }
}

impl ConnectionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Observable connection status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,

    /// Consecutive failed attempts since the last successful connection
    pub failed_attempts: u32,

    /// Retry budget spent; cleared by the next explicit `connect()`
    pub exhausted: bool,

    /// Most recent transport failure
    pub last_error: Option<String>,
}

/// Result of `send()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued on the open connection
    Sent,
    /// Not connected; the message was dropped
    NotConnected,
}

struct Shared {
    provider: Arc<dyn AuditProvider>,
    registry: Arc<SubscriptionRegistry>,
    config: ConnectionConfig,
    status: watch::Sender<ConnectionStatus>,
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut ConnectionStatus)) {
        self.status.send_modify(f);
    }
}

struct Worker {
    handle: JoinHandle<()>,
    outbound: mpsc::UnboundedSender<String>,
}

/// Single owner of the shared event-stream connection
pub struct ConnectionManager {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state
    pub fn new(
        provider: Arc<dyn AuditProvider>,
        registry: Arc<SubscriptionRegistry>,
        config: ConnectionConfig,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            shared: Arc::new(Shared {
                provider,
                registry,
                config,
                status,
            }),
            worker: Mutex::new(None),
        }
    }

    /// Start connecting if currently disconnected
    ///
    /// Returns immediately; observe progress via `watch_status()`. Calling
    /// this while a reconnect is pending (or after retries were exhausted)
    /// starts over with a fresh retry budget. No-op while connecting or
    /// connected.
    pub async fn connect(&self) {
        let mut worker = self.worker.lock().await;

        if let Some(ref w) = *worker {
            if !w.handle.is_finished() && self.state() != ConnectionState::Disconnected {
                return;
            }
        }
        if let Some(w) = worker.take() {
            stop(w).await;
        }

        self.shared.update(|s| {
            s.state = ConnectionState::Connecting;
            s.failed_attempts = 0;
            s.exhausted = false;
            s.last_error = None;
        });

        let (outbound, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(supervise(self.shared.clone(), rx));
        *worker = Some(Worker { handle, outbound });

        tracing::info!(provider = self.shared.provider.name(), "Event stream connecting");
    }

    /// Close the transport and cancel any pending reconnect. Idempotent.
    pub async fn disconnect(&self) {
        let worker = self.worker.lock().await.take();
        let was_running = worker.is_some();
        if let Some(w) = worker {
            stop(w).await;
        }

        self.shared.update(|s| {
            s.state = ConnectionState::Disconnected;
            s.failed_attempts = 0;
            s.exhausted = false;
        });

        if was_running {
            tracing::info!(provider = self.shared.provider.name(), "Event stream disconnected");
        }
    }

    /// Serialize and transmit a message if connected
    ///
    /// Sending while not connected is not an error: the message is dropped
    /// with a warning and `SendOutcome::NotConnected` is returned.
    pub async fn send<T: Serialize + ?Sized>(&self, message: &T) -> Result<SendOutcome> {
        if self.state() != ConnectionState::Connected {
            tracing::warn!("Event stream is not connected, message dropped");
            return Ok(SendOutcome::NotConnected);
        }

        let frame = serde_json::to_string(message)?;
        let worker = self.worker.lock().await;
        match worker.as_ref() {
            Some(w) if w.outbound.send(frame).is_ok() => Ok(SendOutcome::Sent),
            _ => {
                tracing::warn!("Event stream closed while sending, message dropped");
                Ok(SendOutcome::NotConnected)
            }
        }
    }

    /// Register a consumer for `channel` and make sure the connection is up
    ///
    /// Replaces any existing handler for the channel.
    pub async fn attach(
        &self,
        channel: impl Into<String>,
        handler: impl Fn(InboundMessage) + Send + Sync + 'static,
    ) {
        self.shared.registry.subscribe(channel, handler);
        self.connect().await;
    }

    /// Release a consumer; disconnects once no channel remains registered
    ///
    /// Returns true if a handler was removed.
    pub async fn detach(&self, channel: &str) -> bool {
        let removed = self.shared.registry.unsubscribe(channel);
        if self.shared.registry.is_empty() {
            self.disconnect().await;
        }
        removed
    }

    /// Disconnect and drop every channel registration
    pub async fn shutdown(&self) {
        for channel in self.shared.registry.channels() {
            self.shared.registry.unsubscribe(&channel);
        }
        self.disconnect().await;
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.status.borrow().state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.shared.registry
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(w) = self.worker.get_mut().take() {
            w.handle.abort();
        }
    }
}

/// Abort a worker and wait until it has actually stopped
async fn stop(worker: Worker) {
    worker.handle.abort();
    let _ = worker.handle.await;
}

/// Connect, pump, and reconnect until the retry budget is spent
async fn supervise(shared: Arc<Shared>, mut outbound: mpsc::UnboundedReceiver<String>) {
    let max = shared.config.max_reconnect_attempts;
    let mut failures: u32 = 0;

    loop {
        shared.update(|s| s.state = ConnectionState::Connecting);

        match shared.provider.open().await {
            Ok(mut conn) => {
                failures = 0;
                shared.update(|s| {
                    s.state = ConnectionState::Connected;
                    s.failed_attempts = 0;
                    s.last_error = None;
                });
                tracing::info!(provider = shared.provider.name(), "Event stream connected");

                let closed = pump(conn.as_mut(), &shared.registry, &mut outbound).await;
                let reason = match closed {
                    Ok(()) => "closed by peer".to_string(),
                    Err(e) => e.to_string(),
                };
                tracing::warn!(reason = %reason, "Event stream lost");
                shared.update(|s| {
                    s.state = ConnectionState::Disconnected;
                    s.last_error = Some(reason);
                });
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(
                    attempt = failures,
                    max_attempts = max,
                    error = %e,
                    "Event stream connection failed"
                );

                if failures >= max {
                    let err = AuditError::RetriesExhausted {
                        attempts: failures,
                        reason: e.to_string(),
                    };
                    tracing::warn!(error = %err, "Giving up on event stream");
                    shared.update(|s| {
                        s.state = ConnectionState::Disconnected;
                        s.failed_attempts = failures;
                        s.exhausted = true;
                        s.last_error = Some(err.to_string());
                    });
                    return;
                }

                shared.update(|s| {
                    s.state = ConnectionState::Disconnected;
                    s.failed_attempts = failures;
                    s.last_error = Some(e.to_string());
                });
            }
        }

        // Frames queued while the link was down are not replayed
        let mut dropped = 0usize;
        while outbound.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::warn!(dropped, "Discarded outbound messages queued during disconnect");
        }

        tokio::time::sleep(shared.config.reconnect_delay()).await;
    }
}

/// Move frames in both directions until the connection closes
async fn pump(
    conn: &mut dyn Connection,
    registry: &SubscriptionRegistry,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> Result<()> {
    loop {
        tokio::select! {
            frame = conn.recv() => match frame? {
                Some(text) => deliver(registry, &text),
                None => return Ok(()),
            },
            Some(frame) = outbound.recv() => {
                conn.send(frame).await?;
            }
        }
    }
}

/// Parse one inbound frame and hand it to its channel's handler
fn deliver(registry: &SubscriptionRegistry, frame: &str) {
    match InboundMessage::parse(frame) {
        Ok(message) => {
            registry.dispatch(message);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dropping malformed event-stream frame");
        }
    }
}
