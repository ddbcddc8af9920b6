//! Networked provider configuration

use crate::error::{AuditError, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Environment variable overriding `ws_url`
pub const WS_URL_ENV: &str = "AUDIT_WS_URL";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "AUDIT_API_URL";

/// Configuration for the WebSocket + HTTP provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsConfig {
    /// Event-stream endpoint (e.g., "ws://localhost:8080")
    pub ws_url: String,

    /// Base URL of the audit log HTTP API
    pub api_url: String,

    /// WebSocket handshake timeout in seconds
    pub connect_timeout_secs: u64,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8080".to_string(),
            api_url: "http://localhost:3000".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl WsConfig {
    /// Defaults overridden by `AUDIT_WS_URL` / `AUDIT_API_URL` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(WS_URL_ENV) {
            config.ws_url = url;
        }
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.api_url = url;
        }
        config
    }

    /// Check both URLs parse and use the expected schemes
    pub fn validate(&self) -> Result<()> {
        let ws = Url::parse(&self.ws_url)
            .map_err(|e| AuditError::Config(format!("invalid ws_url '{}': {}", self.ws_url, e)))?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(AuditError::Config(format!(
                "ws_url must use ws:// or wss://, got '{}'",
                self.ws_url
            )));
        }

        let api = Url::parse(&self.api_url)
            .map_err(|e| AuditError::Config(format!("invalid api_url '{}': {}", self.api_url, e)))?;
        if !matches!(api.scheme(), "http" | "https") {
            return Err(AuditError::Config(format!(
                "api_url must use http:// or https://, got '{}'",
                self.api_url
            )));
        }

        Ok(())
    }

    /// Audit log collection endpoint
    pub fn logs_endpoint(&self) -> String {
        format!("{}/api/audit-logs", self.api_url.trim_end_matches('/'))
    }
}
