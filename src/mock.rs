//! Synthetic audit log generator
//!
//! Produces dashboard-shaped entries for the in-memory provider and for
//! tests. Seeded, so the same seed yields the same log set.

use crate::types::{AuditAction, AuditLogEntry, NewAuditLogEntry};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const USERS: [&str; 4] = [
    "admin@example.com",
    "editor@example.com",
    "user@example.com",
    "manager@example.com",
];

const DETAILS: [&str; 10] = [
    "User logged in successfully",
    "User logged out",
    "Created new user account",
    "Updated user profile",
    "Deleted user account",
    "Modified system settings",
    "Changed user permissions",
    "Updated content",
    "Deleted content",
    "Created new post",
];

const USER_AGENTS: [&str; 5] = [
    "Chrome/Windows",
    "Firefox/MacOS",
    "Safari/iOS",
    "Edge/Windows",
    "Opera/Linux",
];

/// How far back generated timestamps reach
const HISTORY_WINDOW_DAYS: i64 = 30;

/// Seeded generator of synthetic audit log entries
pub struct MockLogGenerator {
    rng: StdRng,
}

impl MockLogGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate `count` entries with ids `1..=count`, spread over the 30 days before `now`
    pub fn history(&mut self, count: usize, now: DateTime<Utc>) -> Vec<AuditLogEntry> {
        let window_ms = Duration::days(HISTORY_WINDOW_DAYS).num_milliseconds();
        (1..=count as u64)
            .map(|id| {
                let offset = self.rng.gen_range(0..window_ms);
                self.fields().into_entry(id, now - Duration::milliseconds(offset))
            })
            .collect()
    }

    /// Random entry fields, as a client would submit them
    pub fn fields(&mut self) -> NewAuditLogEntry {
        let action = *AuditAction::ALL
            .choose(&mut self.rng)
            .unwrap_or(&AuditAction::Login);
        let user = USERS.choose(&mut self.rng).copied().unwrap_or(USERS[0]);
        let details = DETAILS.choose(&mut self.rng).copied().unwrap_or(DETAILS[0]);
        let agent = USER_AGENTS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        let ip = format!("192.168.1.{}", self.rng.gen_range(0..255));

        NewAuditLogEntry::new(user, action, details).with_client(ip, agent)
    }
}

impl Default for MockLogGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}
