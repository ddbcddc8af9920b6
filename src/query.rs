//! Query/filter engine — predicates, ordering, and pagination over a log set
//!
//! Pure functions with no I/O. Used by the in-memory provider to answer
//! fetches and by the store to decide whether a pushed entry belongs in the
//! current view.

use crate::error::Result;
use crate::types::{AuditLogEntry, FetchRequest, FilterSpec, Page, SortOrder};
use std::cmp::Ordering;

/// Check whether an entry satisfies every predicate set on the filter
pub fn matches(entry: &AuditLogEntry, filter: &FilterSpec) -> bool {
    if let Some(action) = filter.action {
        if entry.action != action {
            return false;
        }
    }

    if let Some(ref user) = filter.user {
        if !entry.user.to_lowercase().contains(&user.to_lowercase()) {
            return false;
        }
    }

    if let Some(start) = filter.start_date {
        if entry.timestamp < start {
            return false;
        }
    }

    if let Some(end) = filter.end_date {
        if entry.timestamp > end {
            return false;
        }
    }

    true
}

/// Total order used for display: timestamp first, id as tie-breaker
pub fn compare(a: &AuditLogEntry, b: &AuditLogEntry, sort: SortOrder) -> Ordering {
    let ascending = a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id));
    match sort {
        SortOrder::NewestFirst => ascending.reverse(),
        SortOrder::OldestFirst => ascending,
    }
}

/// Collect the entries matching `filter`, sorted by `sort`
pub fn filter_sorted<'a>(
    entries: &'a [AuditLogEntry],
    filter: &FilterSpec,
    sort: SortOrder,
) -> Vec<&'a AuditLogEntry> {
    let mut matched: Vec<&AuditLogEntry> =
        entries.iter().filter(|e| matches(e, filter)).collect();
    matched.sort_by(|a, b| compare(a, b, sort));
    matched
}

/// Slice `[(page - 1) * limit, page * limit)` out of `items`
///
/// Pages past the end yield an empty slice.
pub fn paginate<T>(items: &[T], page: u32, limit: u32) -> &[T] {
    let limit = limit as usize;
    let start = (page.saturating_sub(1) as usize).saturating_mul(limit);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(limit).min(items.len());
    &items[start..end]
}

/// Run a full fetch request over an in-memory log set
pub fn query(entries: &[AuditLogEntry], request: &FetchRequest) -> Result<Page> {
    request.validate()?;

    let matched = filter_sorted(entries, &request.filters, request.sort);
    let slice = paginate(&matched, request.page, request.limit);

    Ok(Page {
        entries: slice.iter().map(|e| (*e).clone()).collect(),
        page: request.page,
        limit: request.limit,
        total: matched.len() as u64,
    })
}
