//! Audit log store — the paginated, filtered view a dashboard renders
//!
//! `AuditLogStore` owns the current page and query, issues fetches through
//! an `AuditProvider`, and merges real-time pushes into the view. Every
//! fetch is tagged with a sequence number; a response that is not for the
//! most recently issued request is discarded, so a slow earlier fetch can
//! never overwrite a newer filter's results.

use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::provider::AuditProvider;
use crate::query;
use crate::types::{
    AuditLogEntry, FetchRequest, FilterSpec, InboundMessage, NewAuditLogEntry, Page, SortOrder,
    AUDIT_LOG_CHANNEL, AUDIT_LOG_MESSAGE_TYPE,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// How a real-time push is merged into the visible page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RealtimeMerge {
    /// Insert the entry into the current view and bump `total`
    #[default]
    Prepend,
    /// Re-issue the current query
    Refetch,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Page size before the first explicit fetch
    pub default_limit: u32,

    /// Initial real-time mode
    pub realtime: bool,

    pub merge: RealtimeMerge,

    /// Pushes kept while real-time mode is off, and merged pushes tracked
    /// for deduplication (oldest dropped first)
    pub max_pending: usize,

    /// Channel the store listens on when mounted
    pub channel: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            realtime: false,
            merge: RealtimeMerge::default(),
            max_pending: 1000,
            channel: AUDIT_LOG_CHANNEL.to_string(),
        }
    }
}

/// Result of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response replaced the visible page
    Applied,
    /// A newer request was issued meanwhile; the response was discarded
    Superseded,
}

/// What a real-time push did to the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeOutcome {
    /// Inserted into the visible page; `total` incremented
    Inserted,
    /// Matches the filter but falls outside the visible page; `total` incremented
    Counted,
    /// Does not match the active filter
    Filtered,
    /// Already reflected in the view
    Duplicate,
    /// Real-time mode is off; held until the next fetch
    Buffered,
    /// The caller should re-issue the current query
    RefetchRequested,
}

/// Read model handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub entries: Vec<AuditLogEntry>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub filters: FilterSpec,
    pub sort: SortOrder,
    pub loading: bool,
    pub error: Option<String>,
    pub realtime: bool,
    /// Pushes buffered while real-time mode was off
    pub pending: usize,
}

impl StoreSnapshot {
    /// Number of pages for the current total
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit as u64)
    }
}

/// A push, numbered in arrival order
struct Arrival {
    at: u64,
    entry: AuditLogEntry,
}

struct State {
    /// Last successfully applied page
    view: Page,
    /// Query that produced `view`
    view_query: FetchRequest,
    /// Most recently issued query
    requested: FetchRequest,
    seq: u64,
    loading: bool,
    error: Option<String>,
    realtime: bool,
    /// Pushes received so far
    arrivals: u64,
    /// Value of `arrivals` when `requested` was issued
    issued_at: u64,
    pending: VecDeque<Arrival>,
    /// Pushes merged since the last applied fetch
    merged: VecDeque<Arrival>,
}

/// Paginated, filterable audit log view backed by a provider
pub struct AuditLogStore {
    provider: Arc<dyn AuditProvider>,
    config: StoreConfig,
    state: Mutex<State>,
    revision: watch::Sender<u64>,
}

impl AuditLogStore {
    pub fn new(provider: Arc<dyn AuditProvider>, config: StoreConfig) -> Self {
        let initial = FetchRequest::new(1, config.default_limit.max(1), FilterSpec::default());
        let (revision, _) = watch::channel(0);
        Self {
            provider,
            state: Mutex::new(State {
                view: Page::empty(initial.limit),
                view_query: initial.clone(),
                requested: initial,
                seq: 0,
                loading: false,
                error: None,
                realtime: config.realtime,
                arrivals: 0,
                issued_at: 0,
                pending: VecDeque::new(),
                merged: VecDeque::new(),
            }),
            config,
            revision,
        }
    }

    /// Fetch `page` of `limit` entries matching `filters`, keeping the current sort
    pub async fn fetch_page(&self, page: u32, limit: u32, filters: FilterSpec) -> Result<FetchOutcome> {
        let sort = self.lock().requested.sort;
        self.fetch(FetchRequest::new(page, limit, filters).with_sort(sort))
            .await
    }

    /// Issue a query and apply its result unless a newer query supersedes it
    ///
    /// On failure the last good page is kept and the error is exposed via
    /// `snapshot().error`.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchOutcome> {
        request.validate()?;

        let seq = {
            let mut st = self.lock();
            st.seq += 1;
            st.requested = request.clone();
            st.issued_at = st.arrivals;
            st.loading = true;
            st.error = None;
            st.seq
        };
        self.bump();

        let result = self.provider.fetch_page(&request).await;

        let mut st = self.lock();
        if st.seq != seq {
            tracing::debug!(seq, latest = st.seq, "Suppressing stale fetch response");
            return Ok(FetchOutcome::Superseded);
        }
        st.loading = false;

        match result {
            Ok(response) => {
                let mut page: Page = response.into();
                page.entries.truncate(request.limit as usize);
                tracing::debug!(
                    seq,
                    page = page.page,
                    total = page.total,
                    returned = page.entries.len(),
                    "Audit log page applied"
                );
                st.view = page;
                st.view_query = request;

                // Pushes that arrived after the request went out may be missing
                // from the response; carry them over
                let issued_at = st.issued_at;
                st.pending.retain(|a| a.at > issued_at);
                let late: Vec<Arrival> = std::mem::take(&mut st.merged)
                    .into_iter()
                    .filter(|a| a.at > issued_at)
                    .collect();
                for arrival in late {
                    if st.view.entries.iter().any(|e| e.id == arrival.entry.id)
                        || !query::matches(&arrival.entry, &st.view_query.filters)
                    {
                        continue;
                    }
                    tracing::debug!(id = arrival.entry.id, "Re-applying push that raced the fetch");
                    self.place(&mut st, arrival);
                }
                drop(st);
                self.bump();
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!(seq, error = %e, "Audit log fetch failed, keeping last page");
                st.error = Some(e.to_string());
                drop(st);
                self.bump();
                Err(e)
            }
        }
    }

    /// Re-issue the most recently requested query
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        let request = self.lock().requested.clone();
        self.fetch(request).await
    }

    /// Apply new filters, returning to the first page
    pub async fn set_filters(&self, filters: FilterSpec) -> Result<FetchOutcome> {
        let mut request = self.lock().requested.clone();
        request.filters = filters;
        request.page = 1;
        self.fetch(request).await
    }

    pub async fn set_page(&self, page: u32) -> Result<FetchOutcome> {
        let mut request = self.lock().requested.clone();
        request.page = page;
        self.fetch(request).await
    }

    /// Change the page size, returning to the first page
    pub async fn set_limit(&self, limit: u32) -> Result<FetchOutcome> {
        let mut request = self.lock().requested.clone();
        request.limit = limit;
        request.page = 1;
        self.fetch(request).await
    }

    /// Change the ordering, returning to the first page
    pub async fn set_sort(&self, sort: SortOrder) -> Result<FetchOutcome> {
        let mut request = self.lock().requested.clone();
        request.sort = sort;
        request.page = 1;
        self.fetch(request).await
    }

    /// Turn real-time merging on or off; does not touch the connection
    pub fn set_realtime_mode(&self, enabled: bool) {
        self.lock().realtime = enabled;
        tracing::info!(enabled, "Real-time mode changed");
        self.bump();
    }

    /// Flip real-time mode, returning the new value
    pub fn toggle_realtime(&self) -> bool {
        let enabled = {
            let mut st = self.lock();
            st.realtime = !st.realtime;
            st.realtime
        };
        tracing::info!(enabled, "Real-time mode changed");
        self.bump();
        enabled
    }

    pub fn is_realtime(&self) -> bool {
        self.lock().realtime
    }

    /// Merge a pushed entry into the view
    ///
    /// With real-time mode off the entry is buffered and the visible page
    /// and total are left untouched.
    pub fn apply_realtime_event(&self, entry: AuditLogEntry) -> RealtimeOutcome {
        let outcome = {
            let mut st = self.lock();
            self.merge(&mut st, entry)
        };
        if outcome != RealtimeOutcome::Filtered && outcome != RealtimeOutcome::Duplicate {
            self.bump();
        }
        outcome
    }

    fn merge(&self, st: &mut State, entry: AuditLogEntry) -> RealtimeOutcome {
        if !st.realtime {
            st.arrivals += 1;
            let at = st.arrivals;
            st.pending.push_back(Arrival { at, entry });
            while st.pending.len() > self.config.max_pending {
                st.pending.pop_front();
            }
            tracing::debug!(pending = st.pending.len(), "Real-time mode off, push buffered");
            return RealtimeOutcome::Buffered;
        }

        if st.merged.iter().any(|a| a.entry.id == entry.id)
            || st.view.entries.iter().any(|e| e.id == entry.id)
        {
            return RealtimeOutcome::Duplicate;
        }
        if !query::matches(&entry, &st.view_query.filters) {
            return RealtimeOutcome::Filtered;
        }
        if self.config.merge == RealtimeMerge::Refetch {
            return RealtimeOutcome::RefetchRequested;
        }

        st.arrivals += 1;
        let at = st.arrivals;
        self.place(st, Arrival { at, entry })
    }

    /// Count a matching push and insert it if it lands on the visible page
    fn place(&self, st: &mut State, arrival: Arrival) -> RealtimeOutcome {
        st.view.total += 1;

        let entry = &arrival.entry;
        let sort = st.view_query.sort;
        let limit = st.view_query.limit as usize;
        let position = st
            .view
            .entries
            .iter()
            .position(|e| query::compare(entry, e, sort) == Ordering::Less)
            .unwrap_or(st.view.entries.len());

        let outcome = if st.view.page == 1 && position < limit {
            tracing::debug!(id = entry.id, position, "Real-time entry inserted");
            st.view.entries.insert(position, entry.clone());
            st.view.entries.truncate(limit);
            RealtimeOutcome::Inserted
        } else {
            RealtimeOutcome::Counted
        };

        st.merged.push_back(arrival);
        while st.merged.len() > self.config.max_pending {
            st.merged.pop_front();
        }
        outcome
    }

    /// Record a new entry through the provider
    ///
    /// In real-time mode the entry is merged into the view right away; a
    /// later push of the same entry is recognised as a duplicate.
    pub async fn record(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry> {
        let created = self.provider.create(entry).await?;
        if self.is_realtime()
            && self.apply_realtime_event(created.clone()) == RealtimeOutcome::RefetchRequested
        {
            self.refresh().await?;
        }
        Ok(created)
    }

    /// Empty the visible view without touching the source
    pub fn clear(&self) {
        {
            let mut st = self.lock();
            st.view.entries.clear();
            st.view.total = 0;
            st.pending.clear();
            st.merged.clear();
        }
        self.bump();
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let st = self.lock();
        StoreSnapshot {
            entries: st.view.entries.clone(),
            total: st.view.total,
            page: st.view.page,
            limit: st.view.limit,
            filters: st.view_query.filters.clone(),
            sort: st.view_query.sort,
            loading: st.loading,
            error: st.error.clone(),
            realtime: st.realtime,
            pending: st.pending.len(),
        }
    }

    /// Entries buffered while real-time mode was off, oldest first
    pub fn pending(&self) -> Vec<AuditLogEntry> {
        self.lock().pending.iter().map(|a| a.entry.clone()).collect()
    }

    /// Revision counter bumped on every visible change
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Channel callback feeding pushes into this store
    ///
    /// Holds only a weak reference, so a registered handler never keeps the
    /// store alive.
    pub fn channel_handler(self: &Arc<Self>) -> impl Fn(InboundMessage) + Send + Sync + 'static {
        let store = Arc::downgrade(self);
        move |message: InboundMessage| {
            let Some(store) = store.upgrade() else {
                return;
            };

            if let Some(kind) = message.kind.as_deref() {
                if kind != AUDIT_LOG_MESSAGE_TYPE {
                    tracing::debug!(kind, "Ignoring non audit-log message");
                    return;
                }
            }

            let entry = match message.entry() {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(channel = %message.channel, error = %e, "Dropping malformed audit log push");
                    return;
                }
            };

            if store.apply_realtime_event(entry) == RealtimeOutcome::RefetchRequested {
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            if let Err(e) = store.refresh().await {
                                tracing::warn!(error = %e, "Real-time refetch failed");
                            }
                        });
                    }
                    Err(_) => tracing::warn!("No runtime available for real-time refetch"),
                }
            }
        }
    }

    /// Subscribe to the store's channel, connect, and load the current query
    pub async fn mount(self: &Arc<Self>, connection: &ConnectionManager) -> Result<FetchOutcome> {
        connection
            .attach(self.config.channel.clone(), self.channel_handler())
            .await;
        self.refresh().await
    }

    /// Release the store's channel; the connection closes if it was the last consumer
    pub async fn unmount(&self, connection: &ConnectionManager) {
        connection.detach(&self.config.channel).await;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::memory::MemoryProvider;
    use crate::types::AuditAction;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(id: u64, minutes: i64, action: AuditAction) -> AuditLogEntry {
        AuditLogEntry {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
            user: "admin@example.com".to_string(),
            action,
            details: "test".to_string(),
            ip_address: "192.168.1.1".to_string(),
            user_agent: "Chrome/Windows".to_string(),
        }
    }

    fn fixture() -> Vec<AuditLogEntry> {
        (1..=25)
            .map(|i| {
                let action = if i % 2 == 0 { AuditAction::Create } else { AuditAction::Login };
                entry(i, i as i64, action)
            })
            .collect()
    }

    fn store_with(provider: &MemoryProvider, config: StoreConfig) -> Arc<AuditLogStore> {
        Arc::new(AuditLogStore::new(Arc::new(provider.clone()), config))
    }

    fn realtime() -> StoreConfig {
        StoreConfig {
            realtime: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_applies_page() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, StoreConfig::default());

        let outcome = store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Applied);

        let snap = store.snapshot();
        assert_eq!(snap.entries.len(), 10);
        assert_eq!(snap.total, 25);
        assert_eq!(snap.entries[0].id, 25);
        assert_eq!(snap.total_pages(), 3);
        assert!(!snap.loading);
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_last_page() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, StoreConfig::default());
        store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();
        let before = store.snapshot();

        provider.fail_next_fetches(1);
        assert!(store.fetch_page(2, 10, FilterSpec::all()).await.is_err());

        let after = store.snapshot();
        assert_eq!(after.entries, before.entries);
        assert_eq!(after.total, before.total);
        assert!(after.error.unwrap().contains("simulated fetch failure"));

        store.refresh().await.unwrap();
        let recovered = store.snapshot();
        assert!(recovered.error.is_none());
        assert_eq!(recovered.page, 2);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected_without_state_change() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, StoreConfig::default());
        assert!(store.fetch_page(0, 10, FilterSpec::all()).await.is_err());
        assert_eq!(provider.fetch_count(), 0);
        assert!(store.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn test_realtime_prepend_on_first_page() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, realtime());
        let filter = FilterSpec::all().with_action(AuditAction::Create);
        store.fetch_page(1, 10, filter).await.unwrap();
        let total = store.snapshot().total;

        let outcome = store.apply_realtime_event(entry(100, 1000, AuditAction::Create));
        assert_eq!(outcome, RealtimeOutcome::Inserted);

        let snap = store.snapshot();
        assert_eq!(snap.entries[0].id, 100);
        assert_eq!(snap.entries.len(), 10);
        assert_eq!(snap.total, total + 1);
    }

    #[tokio::test]
    async fn test_realtime_filtered_and_duplicate() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, realtime());
        store
            .fetch_page(1, 10, FilterSpec::all().with_action(AuditAction::Create))
            .await
            .unwrap();
        let total = store.snapshot().total;

        assert_eq!(
            store.apply_realtime_event(entry(101, 1000, AuditAction::Delete)),
            RealtimeOutcome::Filtered
        );
        assert_eq!(
            store.apply_realtime_event(entry(102, 1000, AuditAction::Create)),
            RealtimeOutcome::Inserted
        );
        assert_eq!(
            store.apply_realtime_event(entry(102, 1000, AuditAction::Create)),
            RealtimeOutcome::Duplicate
        );
        assert_eq!(store.snapshot().total, total + 1);
    }

    #[tokio::test]
    async fn test_realtime_on_later_page_only_counts() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, realtime());
        store.fetch_page(2, 10, FilterSpec::all()).await.unwrap();
        let before = store.snapshot();

        assert_eq!(
            store.apply_realtime_event(entry(200, 1000, AuditAction::Login)),
            RealtimeOutcome::Counted
        );
        let after = store.snapshot();
        assert_eq!(after.entries, before.entries);
        assert_eq!(after.total, before.total + 1);
    }

    #[tokio::test]
    async fn test_realtime_off_buffers() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, StoreConfig::default());
        store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();
        let before = store.snapshot();

        assert_eq!(
            store.apply_realtime_event(entry(300, 1000, AuditAction::Create)),
            RealtimeOutcome::Buffered
        );
        let after = store.snapshot();
        assert_eq!(after.entries, before.entries);
        assert_eq!(after.total, before.total);
        assert_eq!(after.pending, 1);

        store.refresh().await.unwrap();
        assert_eq!(store.snapshot().pending, 0);
    }

    #[tokio::test]
    async fn test_pending_buffer_bounded() {
        let provider = MemoryProvider::with_entries(Vec::new());
        let store = store_with(
            &provider,
            StoreConfig {
                max_pending: 3,
                ..Default::default()
            },
        );
        for id in 1..=5 {
            store.apply_realtime_event(entry(id, id as i64, AuditAction::Login));
        }
        let ids: Vec<u64> = store.pending().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_merged_tracking_bounded() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(
            &provider,
            StoreConfig {
                realtime: true,
                max_pending: 4,
                ..Default::default()
            },
        );
        store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();

        for id in 100..120 {
            store.apply_realtime_event(entry(id, 1000 + id as i64, AuditAction::Login));
        }
        assert_eq!(store.lock().merged.len(), 4);

        let snap = store.snapshot();
        assert_eq!(snap.total, 45);
        assert_eq!(snap.entries[0].id, 119);
    }

    #[tokio::test]
    async fn test_refetch_merge_requests_refetch() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(
            &provider,
            StoreConfig {
                realtime: true,
                merge: RealtimeMerge::Refetch,
                ..Default::default()
            },
        );
        store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();
        assert_eq!(
            store.apply_realtime_event(entry(400, 1000, AuditAction::Update)),
            RealtimeOutcome::RefetchRequested
        );
        // Refetch mode never edits the view in place
        assert_eq!(store.snapshot().total, 25);
    }

    #[tokio::test]
    async fn test_toggle_and_clear() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, StoreConfig::default());
        assert!(!store.is_realtime());
        assert!(store.toggle_realtime());
        assert!(!store.toggle_realtime());
        store.set_realtime_mode(true);
        assert!(store.is_realtime());

        store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();
        store.clear();
        let snap = store.snapshot();
        assert!(snap.entries.is_empty());
        assert_eq!(snap.total, 0);
    }

    #[tokio::test]
    async fn test_record_in_realtime_mode() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, realtime());
        store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();

        let created = store
            .record(NewAuditLogEntry::new("editor@example.com", AuditAction::Update, "Updated content"))
            .await
            .unwrap();
        assert_eq!(created.id, 26);

        let snap = store.snapshot();
        assert_eq!(snap.entries[0].id, 26);
        assert_eq!(snap.total, 26);
        assert_eq!(
            store.apply_realtime_event(created),
            RealtimeOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn test_commands_compose_query() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, StoreConfig::default());

        store.set_page(3).await.unwrap();
        assert_eq!(store.snapshot().page, 3);

        store
            .set_filters(FilterSpec::all().with_action(AuditAction::Login))
            .await
            .unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.page, 1);
        assert_eq!(snap.total, 13);

        store.set_limit(5).await.unwrap();
        let snap = store.snapshot();
        assert_eq!(snap.limit, 5);
        assert_eq!(snap.entries.len(), 5);
        assert_eq!(snap.filters.action, Some(AuditAction::Login));

        store.set_sort(SortOrder::OldestFirst).await.unwrap();
        assert_eq!(store.snapshot().entries[0].id, 1);
    }

    #[tokio::test]
    async fn test_watch_revision_advances() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, StoreConfig::default());
        let mut rx = store.watch();
        let start = *rx.borrow_and_update();

        store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow() > start);
    }

    #[tokio::test]
    async fn test_channel_handler_ignores_other_types() {
        let provider = MemoryProvider::with_entries(fixture());
        let store = store_with(&provider, realtime());
        store.fetch_page(1, 10, FilterSpec::all()).await.unwrap();
        let handler = store.channel_handler();

        let mut msg = InboundMessage::audit_log(AUDIT_LOG_CHANNEL, &entry(500, 1000, AuditAction::Login)).unwrap();
        msg.kind = Some("NOTIFICATION".to_string());
        handler(msg);
        assert_eq!(store.snapshot().total, 25);

        handler(InboundMessage {
            channel: AUDIT_LOG_CHANNEL.to_string(),
            kind: None,
            payload: serde_json::json!({"garbage": true}),
        });
        assert_eq!(store.snapshot().total, 25);

        handler(InboundMessage::audit_log(AUDIT_LOG_CHANNEL, &entry(501, 1000, AuditAction::Login)).unwrap());
        assert_eq!(store.snapshot().total, 26);
    }
}
