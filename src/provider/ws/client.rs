//! HTTP + WebSocket client — fetch, create, and open the event stream

use super::config::WsConfig;
use crate::error::{AuditError, Result};
use crate::provider::Connection;
use crate::types::{AuditLogEntry, FetchRequest, FetchResponse, NewAuditLogEntry};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Low-level client for the audit log HTTP API and event stream
pub struct WsClient {
    http: reqwest::Client,
    config: Arc<WsConfig>,
}

impl WsClient {
    /// Build a client after validating the configuration
    pub fn new(config: WsConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AuditError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// `GET /api/audit-logs` with pagination, filter, and sort parameters
    pub async fn fetch_page(&self, request: &FetchRequest) -> Result<FetchResponse> {
        request.validate()?;

        let response = self
            .http
            .get(self.config.logs_endpoint())
            .query(&query_params(request))
            .send()
            .await
            .map_err(|e| AuditError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuditError::Fetch(e.to_string()))?;

        let page: FetchResponse = response
            .json()
            .await
            .map_err(|e| AuditError::Fetch(format!("invalid response body: {}", e)))?;

        tracing::debug!(
            page = page.page,
            limit = page.limit,
            total = page.total,
            returned = page.logs.len(),
            "Audit log page fetched"
        );

        Ok(page)
    }

    /// `POST /api/audit-logs`
    pub async fn create(&self, entry: &NewAuditLogEntry) -> Result<AuditLogEntry> {
        let created: AuditLogEntry = self
            .http
            .post(self.config.logs_endpoint())
            .json(entry)
            .send()
            .await
            .map_err(|e| AuditError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuditError::Fetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuditError::Fetch(format!("invalid response body: {}", e)))?;

        tracing::debug!(id = created.id, action = %created.action, "Audit log created");
        Ok(created)
    }

    /// Perform the WebSocket handshake
    pub async fn open(&self) -> Result<WsConnection> {
        let url = self.config.ws_url.as_str();
        let handshake = tokio_tungstenite::connect_async(url);

        let (stream, _response) =
            tokio::time::timeout(Duration::from_secs(self.config.connect_timeout_secs), handshake)
                .await
                .map_err(|_| {
                    AuditError::Transport(format!(
                        "{}: handshake timed out after {}s",
                        url, self.config.connect_timeout_secs
                    ))
                })?
                .map_err(|e| AuditError::Transport(format!("{}: {}", url, e)))?;

        tracing::info!(url = %url, "WebSocket connected");
        Ok(WsConnection { stream })
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }
}

/// Flatten a fetch request into query-string pairs, omitting absent filters
fn query_params(request: &FetchRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", request.page.to_string()),
        ("limit", request.limit.to_string()),
        ("sort", request.sort.as_str().to_string()),
    ];

    let filters = &request.filters;
    if let Some(action) = filters.action {
        params.push(("action", action.as_str().to_string()));
    }
    if let Some(ref user) = filters.user {
        params.push(("user", user.clone()));
    }
    if let Some(start) = filters.start_date {
        params.push(("startDate", start.to_rfc3339()));
    }
    if let Some(end) = filters.end_date {
        params.push(("endDate", end.to_rfc3339()));
    }

    params
}

/// Open WebSocket event stream
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn recv(&mut self) -> Result<Option<String>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(text)) => return Ok(Some(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping non-UTF-8 binary frame");
                    }
                },
                Ok(Message::Close(frame)) => {
                    tracing::info!(frame = ?frame, "WebSocket closed by peer");
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite
                Ok(_) => {}
                Err(e) => return Err(AuditError::Transport(e.to_string())),
            }
        }
        Ok(None)
    }

    async fn send(&mut self, frame: String) -> Result<()> {
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| AuditError::Transport(e.to_string()))
    }
}
