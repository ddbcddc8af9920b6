//! Error types for a3s-audit

use thiserror::Error;

/// Errors that can occur in the audit log pipeline
#[derive(Debug, Error)]
pub enum AuditError {
    /// Connection could not be established or was lost
    #[error("Transport error: {0}")]
    Transport(String),

    /// Bounded reconnect loop gave up
    #[error("Connection retries exhausted after {attempts} attempts: {reason}")]
    RetriesExhausted {
        attempts: u32,
        reason: String,
    },

    /// A page/filter query failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Inbound real-time frame could not be parsed or had no channel
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;
