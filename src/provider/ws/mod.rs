//! Networked audit provider
//!
//! Fetches pages and records entries over the dashboard's HTTP API and
//! receives pushes over a WebSocket event stream.

mod client;
mod config;

pub use client::{WsClient, WsConnection};
pub use config::{WsConfig, API_URL_ENV, WS_URL_ENV};

use crate::error::Result;
use crate::provider::{AuditProvider, Connection};
use crate::types::{AuditLogEntry, FetchRequest, FetchResponse, NewAuditLogEntry};
use async_trait::async_trait;

/// WebSocket + HTTP audit provider
///
/// Wraps `WsClient` and implements the `AuditProvider` trait.
pub struct WsProvider {
    client: WsClient,
}

impl WsProvider {
    pub fn new(config: WsConfig) -> Result<Self> {
        Ok(Self {
            client: WsClient::new(config)?,
        })
    }

    /// Provider configured from `AUDIT_WS_URL` / `AUDIT_API_URL`
    pub fn from_env() -> Result<Self> {
        Self::new(WsConfig::from_env())
    }

    /// Get the underlying client for advanced usage
    pub fn client(&self) -> &WsClient {
        &self.client
    }
}

#[async_trait]
impl AuditProvider for WsProvider {
    async fn fetch_page(&self, request: &FetchRequest) -> Result<FetchResponse> {
        self.client.fetch_page(request).await
    }

    async fn create(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry> {
        self.client.create(&entry).await
    }

    async fn open(&self) -> Result<Box<dyn Connection>> {
        let conn = self.client.open().await?;
        Ok(Box::new(conn))
    }

    fn name(&self) -> &str {
        "ws"
    }
}
