//! In-memory audit provider
//!
//! Simulated backend for development and tests: a seeded synthetic log set
//! answered through the query engine, plus an in-process push stream.
//! Failure injection hooks let tests drive the error paths.

use super::{AuditProvider, Connection};
use crate::error::{AuditError, Result};
use crate::mock::MockLogGenerator;
use crate::query;
use crate::types::{
    AuditLogEntry, FetchRequest, FetchResponse, InboundMessage, NewAuditLogEntry,
    AUDIT_LOG_CHANNEL,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};

/// Configuration for the in-memory provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    /// Number of synthetic entries generated at construction
    pub seed_count: usize,

    /// Generator seed
    pub seed: u64,

    /// Channel pushes are published on
    pub channel: String,

    /// Emit a synthetic entry on every open connection at this interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_interval_ms: Option<u64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            seed_count: 111,
            seed: 0,
            channel: AUDIT_LOG_CHANNEL.to_string(),
            push_interval_ms: None,
        }
    }
}

struct Shared {
    logs: RwLock<Vec<AuditLogEntry>>,
    next_id: AtomicU64,
    generator: Mutex<MockLogGenerator>,
    /// Frame senders of open connections
    sessions: Mutex<Vec<mpsc::UnboundedSender<String>>>,
    /// Frames clients sent upstream
    sent: Mutex<Vec<String>>,
    fail_connects: AtomicU32,
    fail_fetches: AtomicU32,
    open_attempts: AtomicU32,
    fetches: AtomicU32,
}

/// In-memory audit provider
///
/// Cheap to clone; clones share the same log set and sessions.
#[derive(Clone)]
pub struct MemoryProvider {
    config: Arc<MemoryConfig>,
    shared: Arc<Shared>,
}

impl MemoryProvider {
    /// Create a provider seeded with `config.seed_count` synthetic entries
    pub fn new(config: MemoryConfig) -> Self {
        let mut generator = MockLogGenerator::new(config.seed);
        let logs = generator.history(config.seed_count, Utc::now());
        Self::build(config, logs, generator)
    }

    /// Create a provider over a fixed log set
    pub fn with_entries(entries: Vec<AuditLogEntry>) -> Self {
        let config = MemoryConfig {
            seed_count: 0,
            ..Default::default()
        };
        let generator = MockLogGenerator::new(config.seed);
        Self::build(config, entries, generator)
    }

    fn build(config: MemoryConfig, logs: Vec<AuditLogEntry>, generator: MockLogGenerator) -> Self {
        let next_id = logs.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        Self {
            config: Arc::new(config),
            shared: Arc::new(Shared {
                logs: RwLock::new(logs),
                next_id: AtomicU64::new(next_id),
                generator: Mutex::new(generator),
                sessions: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
                fail_connects: AtomicU32::new(0),
                fail_fetches: AtomicU32::new(0),
                open_attempts: AtomicU32::new(0),
                fetches: AtomicU32::new(0),
            }),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Snapshot of the full log set, in insertion order
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.shared.logs.read().await.clone()
    }

    /// Append an already-formed entry and push it to every open connection
    pub async fn publish(&self, entry: AuditLogEntry) -> Result<()> {
        self.shared.next_id.fetch_max(entry.id.saturating_add(1), Ordering::SeqCst);
        self.shared.logs.write().await.push(entry.clone());
        let frame = serde_json::to_string(&InboundMessage::audit_log(
            self.config.channel.clone(),
            &entry,
        )?)?;
        self.push_raw(frame).await;
        Ok(())
    }

    /// Push a raw frame to every open connection, returning how many received it
    pub async fn push_raw(&self, frame: impl Into<String>) -> usize {
        let frame = frame.into();
        let mut sessions = self.shared.sessions.lock().await;
        sessions.retain(|tx| tx.send(frame.clone()).is_ok());
        sessions.len()
    }

    /// Close every open connection from the server side
    pub async fn drop_connections(&self) {
        let mut sessions = self.shared.sessions.lock().await;
        tracing::debug!(count = sessions.len(), "Dropping memory connections");
        sessions.clear();
    }

    /// Number of currently open connections
    pub async fn open_connections(&self) -> usize {
        let mut sessions = self.shared.sessions.lock().await;
        sessions.retain(|tx| !tx.is_closed());
        sessions.len()
    }

    /// Frames clients have sent upstream
    pub async fn sent_frames(&self) -> Vec<String> {
        self.shared.sent.lock().await.clone()
    }

    /// Fail the next `n` calls to `open()` (`u32::MAX` for always)
    pub fn fail_next_connects(&self, n: u32) {
        self.shared.fail_connects.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` calls to `fetch_page()`
    pub fn fail_next_fetches(&self, n: u32) {
        self.shared.fail_fetches.store(n, Ordering::SeqCst);
    }

    /// Total `open()` calls so far, successful or not
    pub fn open_attempts(&self) -> u32 {
        self.shared.open_attempts.load(Ordering::SeqCst)
    }

    /// Total `fetch_page()` calls so far
    pub fn fetch_count(&self) -> u32 {
        self.shared.fetches.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> u64 {
        self.shared.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn spawn_pusher(&self, tx: mpsc::WeakUnboundedSender<String>, every: Duration) {
        let provider = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                // Stops once the connection is closed from either side
                let Some(tx) = tx.upgrade() else { break };

                let fields = provider.shared.generator.lock().await.fields();
                let entry = fields.into_entry(provider.next_id(), Utc::now());
                provider.shared.logs.write().await.push(entry.clone());
                let frame = InboundMessage::audit_log(provider.config.channel.clone(), &entry)
                    .and_then(|msg| serde_json::to_string(&msg).map_err(AuditError::from));
                match frame {
                    Ok(frame) => {
                        if tx.send(frame).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to encode synthetic push"),
                }
            }
            tracing::debug!("Synthetic push loop stopped");
        });
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

/// Decrement a failure budget, returning true if this call should fail
fn take_failure(budget: &AtomicU32) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
            0 => None,
            u32::MAX => Some(u32::MAX),
            n => Some(n - 1),
        })
        .is_ok()
}

#[async_trait]
impl AuditProvider for MemoryProvider {
    async fn fetch_page(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.shared.fetches.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.shared.fail_fetches) {
            return Err(AuditError::Fetch("simulated fetch failure".to_string()));
        }

        let logs = self.shared.logs.read().await;
        let page = query::query(&logs, request)?;
        Ok(page.into())
    }

    async fn create(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry> {
        let entry = entry.into_entry(self.next_id(), Utc::now());
        self.publish(entry.clone()).await?;
        tracing::debug!(id = entry.id, action = %entry.action, "Audit log created");
        Ok(entry)
    }

    async fn open(&self) -> Result<Box<dyn Connection>> {
        self.shared.open_attempts.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.shared.fail_connects) {
            return Err(AuditError::Transport(
                "simulated connection failure".to_string(),
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(ms) = self.config.push_interval_ms {
            self.spawn_pusher(tx.downgrade(), Duration::from_millis(ms));
        }
        self.shared.sessions.lock().await.push(tx);

        let id = uuid::Uuid::new_v4();
        tracing::info!(session = %id, "Memory connection opened");
        Ok(Box::new(MemoryConnection {
            id,
            rx,
            shared: self.shared.clone(),
        }))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// In-process event-stream connection
pub struct MemoryConnection {
    id: uuid::Uuid,
    rx: mpsc::UnboundedReceiver<String>,
    shared: Arc<Shared>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn recv(&mut self) -> Result<Option<String>> {
        Ok(self.rx.recv().await)
    }

    async fn send(&mut self, frame: String) -> Result<()> {
        tracing::debug!(session = %self.id, "Memory connection send");
        self.shared.sent.lock().await.push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuditAction, FilterSpec};

    #[tokio::test]
    async fn test_seeded_log_set() {
        let provider = MemoryProvider::default();
        assert_eq!(provider.entries().await.len(), 111);

        let resp = provider
            .fetch_page(&FetchRequest::new(1, 10, FilterSpec::all()))
            .await
            .unwrap();
        assert_eq!(resp.logs.len(), 10);
        assert_eq!(resp.total, 111);
    }

    #[tokio::test]
    async fn test_fail_next_fetches() {
        let provider = MemoryProvider::default();
        provider.fail_next_fetches(1);

        let req = FetchRequest::default();
        assert!(matches!(provider.fetch_page(&req).await, Err(AuditError::Fetch(_))));
        assert!(provider.fetch_page(&req).await.is_ok());
        assert_eq!(provider.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_connects_forever() {
        let provider = MemoryProvider::default();
        provider.fail_next_connects(u32::MAX);
        for _ in 0..3 {
            assert!(provider.open().await.is_err());
        }
        assert_eq!(provider.open_attempts(), 3);
    }

    #[tokio::test]
    async fn test_create_pushes_to_open_connections() {
        let provider = MemoryProvider::with_entries(Vec::new());
        let mut conn = provider.open().await.unwrap();

        let created = provider
            .create(NewAuditLogEntry::new("admin@example.com", AuditAction::Create, "Created new post"))
            .await
            .unwrap();
        assert_eq!(created.id, 1);

        let frame = conn.recv().await.unwrap().unwrap();
        let msg = InboundMessage::parse(&frame).unwrap();
        assert_eq!(msg.channel, AUDIT_LOG_CHANNEL);
        assert_eq!(msg.entry().unwrap(), created);
        assert_eq!(provider.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_drop_connections_closes_stream() {
        let provider = MemoryProvider::default();
        let mut conn = provider.open().await.unwrap();
        assert_eq!(provider.open_connections().await, 1);

        provider.drop_connections().await;
        assert!(conn.recv().await.unwrap().is_none());
        assert_eq!(provider.open_connections().await, 0);
    }

    #[tokio::test]
    async fn test_connection_send_is_recorded() {
        let provider = MemoryProvider::default();
        let mut conn = provider.open().await.unwrap();
        conn.send("{\"ping\":true}".to_string()).await.unwrap();
        assert_eq!(provider.sent_frames().await, vec!["{\"ping\":true}"]);
    }

    #[tokio::test]
    async fn test_publish_max_id() {
        let provider = MemoryProvider::with_entries(Vec::new());
        let entry = NewAuditLogEntry::new("admin@example.com", AuditAction::Delete, "Deleted content")
            .into_entry(u64::MAX, Utc::now());

        provider.publish(entry).await.unwrap();
        let entries = provider.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthetic_pushes() {
        let provider = MemoryProvider::new(MemoryConfig {
            seed_count: 0,
            push_interval_ms: Some(5000),
            ..Default::default()
        });
        let mut conn = provider.open().await.unwrap();

        let frame = conn.recv().await.unwrap().unwrap();
        let entry = InboundMessage::parse(&frame).unwrap().entry().unwrap();
        assert_eq!(entry.id, 1);
        assert_eq!(provider.entries().await.len(), 1);
    }
}
