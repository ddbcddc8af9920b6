//! Audit data-source trait — the injected capability behind the store and connection
//!
//! A provider answers paged queries, records new entries, and opens the
//! real-time event stream. Backends are selected at construction time:
//! `memory` simulates everything in-process, `ws` talks HTTP + WebSocket.

use crate::error::Result;
use crate::types::{AuditLogEntry, FetchRequest, FetchResponse, NewAuditLogEntry};
use async_trait::async_trait;

pub mod memory;
pub mod ws;

/// Core trait for audit log backends
#[async_trait]
pub trait AuditProvider: Send + Sync {
    /// Answer a paged, filtered query
    async fn fetch_page(&self, request: &FetchRequest) -> Result<FetchResponse>;

    /// Record a new entry, returning it with source-assigned id and timestamp
    async fn create(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry>;

    /// Open the real-time event stream
    ///
    /// Each call establishes a fresh transport; the connection manager owns
    /// the returned handle and decides when to reopen it.
    async fn open(&self) -> Result<Box<dyn Connection>>;

    /// Provider name (e.g., "memory", "ws")
    fn name(&self) -> &str;
}

/// An open event-stream transport
///
/// Frames are raw text; parsing and channel dispatch live in the
/// connection manager so every backend shares the same wire handling.
#[async_trait]
pub trait Connection: Send {
    /// Receive the next inbound frame, or `None` once the peer closed
    async fn recv(&mut self) -> Result<Option<String>>;

    /// Transmit an outbound frame
    async fn send(&mut self, frame: String) -> Result<()>;
}
