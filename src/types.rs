//! Core audit log types
//!
//! All wire types use camelCase JSON serialization, matching the dashboard
//! API (`ipAddress`, `userAgent`, `startDate`, ...).

use crate::error::{AuditError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message `type` tag carried by audit log pushes
pub const AUDIT_LOG_MESSAGE_TYPE: &str = "AUDIT_LOG";

/// Default channel audit log pushes are published on
pub const AUDIT_LOG_CHANNEL: &str = "audit-logs";

/// Closed set of auditable actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    Logout,
    Create,
    Update,
    Delete,
}

impl AuditAction {
    /// All actions, in declaration order
    pub const ALL: [AuditAction; 5] = [
        AuditAction::Login,
        AuditAction::Logout,
        AuditAction::Create,
        AuditAction::Update,
        AuditAction::Delete,
    ];

    /// Wire name (e.g. `"LOGIN"`)
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AuditError::Config(format!("Unknown audit action: '{}'", s)))
    }
}

/// A single immutable audit log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Unique identifier, used as the ordering tie-breaker
    pub id: u64,

    /// When the action happened
    pub timestamp: DateTime<Utc>,

    /// Acting user (e.g. `admin@example.com`)
    pub user: String,

    /// What the user did
    pub action: AuditAction,

    /// Free-text description
    pub details: String,

    /// Client IP address
    pub ip_address: String,

    /// Client user agent
    pub user_agent: String,
}

/// Fields supplied when recording a new entry; id and timestamp are assigned by the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuditLogEntry {
    pub user: String,
    pub action: AuditAction,
    pub details: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub user_agent: String,
}

impl NewAuditLogEntry {
    /// Create a new entry with empty client metadata
    pub fn new(user: impl Into<String>, action: AuditAction, details: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            action,
            details: details.into(),
            ip_address: String::new(),
            user_agent: String::new(),
        }
    }

    /// Attach client metadata
    pub fn with_client(mut self, ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.ip_address = ip_address.into();
        self.user_agent = user_agent.into();
        self
    }

    /// Materialize into a full entry
    pub fn into_entry(self, id: u64, timestamp: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id,
            timestamp,
            user: self.user,
            action: self.action,
            details: self.details,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        }
    }
}

/// Optional predicates narrowing the audit log view
///
/// All fields absent matches everything. `start_date <= end_date` is not
/// validated: an inverted range simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Exact action match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<AuditAction>,

    /// Case-insensitive substring of the acting user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Inclusive lower bound on timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    /// Inclusive upper bound on timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl FilterSpec {
    /// Filter that matches every entry
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// True when no predicate is set
    pub fn is_empty(&self) -> bool {
        self.action.is_none()
            && self.user.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

/// Ordering applied before pagination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    /// Timestamp descending, ties by id descending
    #[default]
    NewestFirst,
    /// Timestamp ascending, ties by id ascending
    OldestFirst,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::NewestFirst => "newestFirst",
            SortOrder::OldestFirst => "oldestFirst",
        }
    }
}

/// A page request: `{ page, limit, filters }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// 1-based page number
    pub page: u32,

    /// Page size
    pub limit: u32,

    #[serde(default)]
    pub filters: FilterSpec,

    #[serde(default)]
    pub sort: SortOrder,
}

impl FetchRequest {
    pub fn new(page: u32, limit: u32, filters: FilterSpec) -> Self {
        Self {
            page,
            limit,
            filters,
            sort: SortOrder::default(),
        }
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Reject zero page or limit
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(AuditError::Config("page must be >= 1".to_string()));
        }
        if self.limit == 0 {
            return Err(AuditError::Config("limit must be >= 1".to_string()));
        }
        Ok(())
    }
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self::new(1, 10, FilterSpec::default())
    }
}

/// Response shape of the fetch interface: `{ logs, total, page, limit }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub logs: Vec<AuditLogEntry>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// One page of the filtered, sorted log set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// At most `limit` entries
    pub entries: Vec<AuditLogEntry>,

    pub page: u32,

    pub limit: u32,

    /// Size of the full filtered set, independent of pagination
    pub total: u64,
}

impl Page {
    /// Empty first page
    pub fn empty(limit: u32) -> Self {
        Self {
            entries: Vec::new(),
            page: 1,
            limit,
            total: 0,
        }
    }
}

impl From<FetchResponse> for Page {
    fn from(resp: FetchResponse) -> Self {
        Self {
            entries: resp.logs,
            page: resp.page,
            limit: resp.limit,
            total: resp.total,
        }
    }
}

impl From<Page> for FetchResponse {
    fn from(page: Page) -> Self {
        Self {
            logs: page.entries,
            total: page.total,
            page: page.page,
            limit: page.limit,
        }
    }
}

/// Inbound real-time frame: `{ channel, type?, payload }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel the frame is addressed to
    pub channel: String,

    /// Optional message kind (e.g. `"AUDIT_LOG"`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Channel-specific payload
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl InboundMessage {
    /// Build an `AUDIT_LOG` push for an entry
    pub fn audit_log(channel: impl Into<String>, entry: &AuditLogEntry) -> Result<Self> {
        Ok(Self {
            channel: channel.into(),
            kind: Some(AUDIT_LOG_MESSAGE_TYPE.to_string()),
            payload: serde_json::to_value(entry)?,
        })
    }

    /// Parse a raw text frame
    ///
    /// Fails with `MalformedMessage` on invalid JSON or an empty channel.
    pub fn parse(frame: &str) -> Result<Self> {
        let msg: InboundMessage = serde_json::from_str(frame)
            .map_err(|e| AuditError::MalformedMessage(e.to_string()))?;
        if msg.channel.is_empty() {
            return Err(AuditError::MalformedMessage("missing channel".to_string()));
        }
        Ok(msg)
    }

    /// Decode the payload as an audit log entry
    pub fn entry(&self) -> Result<AuditLogEntry> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| AuditError::MalformedMessage(format!("invalid audit log payload: {}", e)))
    }
}

/// Lifecycle of the shared event-stream connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_entry() -> AuditLogEntry {
        AuditLogEntry {
            id: 7,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            user: "admin@example.com".to_string(),
            action: AuditAction::Login,
            details: "User logged in successfully".to_string(),
            ip_address: "192.168.1.10".to_string(),
            user_agent: "Chrome/Windows".to_string(),
        }
    }

    #[test]
    fn test_entry_wire_format() {
        let json = serde_json::to_string(&sample_entry()).unwrap();
        assert!(json.contains("\"action\":\"LOGIN\""));
        assert!(json.contains("\"ipAddress\":\"192.168.1.10\""));
        assert!(json.contains("\"userAgent\":\"Chrome/Windows\""));
        assert!(json.contains("\"timestamp\":\"2024-03-01T12:00:00Z\""));
    }

    #[test]
    fn test_entry_from_dashboard_json() {
        let json = r#"{
            "id": 42,
            "timestamp": "2024-03-01T12:00:00.000Z",
            "user": "editor@example.com",
            "action": "DELETE",
            "details": "Deleted content",
            "ipAddress": "192.168.1.4",
            "userAgent": "Safari/iOS"
        }"#;
        let entry: AuditLogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, 42);
        assert_eq!(entry.action, AuditAction::Delete);
        assert_eq!(entry.user_agent, "Safari/iOS");
    }

    #[test]
    fn test_action_parse() {
        assert_eq!("LOGIN".parse::<AuditAction>().unwrap(), AuditAction::Login);
        assert_eq!("logout".parse::<AuditAction>().unwrap(), AuditAction::Logout);
        assert!("PURGE".parse::<AuditAction>().is_err());
        assert_eq!(AuditAction::Update.to_string(), "UPDATE");
    }

    #[test]
    fn test_filter_spec_skips_absent_fields() {
        let json = serde_json::to_string(&FilterSpec::all()).unwrap();
        assert_eq!(json, "{}");

        let filter = FilterSpec::all().with_action(AuditAction::Create).with_user("adm");
        let json = serde_json::to_string(&filter).unwrap();
        assert!(json.contains("\"action\":\"CREATE\""));
        assert!(json.contains("\"user\":\"adm\""));
        assert!(!json.contains("startDate"));
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_fetch_request_validate() {
        assert!(FetchRequest::default().validate().is_ok());
        assert!(FetchRequest::new(0, 10, FilterSpec::all()).validate().is_err());
        assert!(FetchRequest::new(1, 0, FilterSpec::all()).validate().is_err());
    }

    #[test]
    fn test_inbound_message_parse() {
        let frame = r#"{"channel":"audit-logs","type":"AUDIT_LOG","payload":{
            "id": 1, "timestamp": "2024-03-01T12:00:00Z", "user": "u", "action": "CREATE",
            "details": "d", "ipAddress": "", "userAgent": ""}}"#;
        let msg = InboundMessage::parse(frame).unwrap();
        assert_eq!(msg.channel, "audit-logs");
        assert_eq!(msg.kind.as_deref(), Some(AUDIT_LOG_MESSAGE_TYPE));
        assert_eq!(msg.entry().unwrap().action, AuditAction::Create);
    }

    #[test]
    fn test_inbound_message_malformed() {
        assert!(matches!(
            InboundMessage::parse("not json"),
            Err(AuditError::MalformedMessage(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"channel":"","payload":{}}"#),
            Err(AuditError::MalformedMessage(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"payload":{}}"#),
            Err(AuditError::MalformedMessage(_))
        ));

        let msg = InboundMessage::parse(r#"{"channel":"audit-logs","payload":{"id":"x"}}"#).unwrap();
        assert!(msg.entry().is_err());
    }

    #[test]
    fn test_audit_log_message_builder() {
        let msg = InboundMessage::audit_log(AUDIT_LOG_CHANNEL, &sample_entry()).unwrap();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"AUDIT_LOG\""));
        let parsed = InboundMessage::parse(&json).unwrap();
        assert_eq!(parsed.entry().unwrap(), sample_entry());
    }
}
