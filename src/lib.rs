//! # a3s-audit
//!
//! Real-time audit log delivery, filtering, and pagination for the A3S ecosystem.
//!
//! ## Overview
//!
//! `a3s-audit` keeps a paginated, filterable audit log view in sync with a
//! push stream. A single shared connection is multiplexed across channels,
//! reconnects with a fixed delay and bounded retries, and hands inbound
//! messages to at most one handler per channel. The store merges pushes into
//! the visible page and discards fetch responses that a newer request has
//! superseded.
//!
//! ## Quick Start
//!
//! ```rust
//! use a3s_audit::{
//!     AuditAction, AuditLogStore, ConnectionConfig, ConnectionManager, FilterSpec,
//!     MemoryProvider, StoreConfig, SubscriptionRegistry,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> a3s_audit::Result<()> {
//! let provider = Arc::new(MemoryProvider::default());
//! let connection = ConnectionManager::new(
//!     provider.clone(),
//!     Arc::new(SubscriptionRegistry::new()),
//!     ConnectionConfig::default(),
//! );
//! let store = Arc::new(AuditLogStore::new(provider, StoreConfig::default()));
//!
//! // Subscribe to pushes, connect, and load the first page
//! store.mount(&connection).await?;
//! store.set_realtime_mode(true);
//!
//! store.set_filters(FilterSpec::all().with_action(AuditAction::Login)).await?;
//! let view = store.snapshot();
//! println!("{} of {} login events", view.entries.len(), view.total);
//!
//! store.unmount(&connection).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - **memory** — Seeded synthetic log set with an in-process push stream
//! - **ws** — HTTP API for pages plus a WebSocket event stream
//!
//! ## Architecture
//!
//! - **AuditProvider** trait — injected data source: fetch, create, open stream
//! - **ConnectionManager** — shared connection lifecycle and reconnect policy
//! - **SubscriptionRegistry** — channel → single handler, replace on resubscribe
//! - **AuditLogStore** — current page, filters, real-time merge, stale-response suppression
//! - **query** — filter predicates, ordering, pagination

pub mod connection;
pub mod error;
pub mod mock;
pub mod provider;
pub mod query;
pub mod registry;
pub mod store;
pub mod types;

// Re-export core types
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionStatus, SendOutcome};
pub use error::{AuditError, Result};
pub use mock::MockLogGenerator;
pub use provider::{AuditProvider, Connection};
pub use registry::{ChannelHandler, SubscriptionRegistry};
pub use store::{
    AuditLogStore, FetchOutcome, RealtimeMerge, RealtimeOutcome, StoreConfig, StoreSnapshot,
};
pub use types::{
    AuditAction, AuditLogEntry, ConnectionState, FetchRequest, FetchResponse, FilterSpec,
    InboundMessage, NewAuditLogEntry, Page, SortOrder, AUDIT_LOG_CHANNEL, AUDIT_LOG_MESSAGE_TYPE,
};

// Re-export providers for convenience
pub use provider::memory::{MemoryConfig, MemoryProvider};
pub use provider::ws::{WsClient, WsConfig, WsConnection, WsProvider};
