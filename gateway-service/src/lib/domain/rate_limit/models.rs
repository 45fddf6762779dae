use std::fmt;

use chrono::DateTime;
use chrono::Utc;

/// Which identifier space a contact method belongs to.
///
/// Email and phone quotas are tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Email,
    Phone,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierKind::Email => "email",
            IdentifierKind::Phone => "phone",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        requests_used: u32,
        requests_remaining: u32,
    },
    Blocked {
        retry_after_seconds: i64,
    },
}

/// Snapshot of the counter row for one identifier.
#[derive(Debug, Clone, Copy)]
pub struct WindowSample {
    pub request_count: u32,
    pub window_started_at: Option<DateTime<Utc>>,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl WindowSample {
    pub fn empty() -> Self {
        Self {
            request_count: 0,
            window_started_at: None,
            blocked_until: None,
        }
    }
}

/// Quota status reported on the rate-limit endpoint.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    pub identifier: String,
    pub current_count: u32,
    pub max_requests: u32,
    pub remaining: u32,
    pub reset_in_seconds: i64,
    pub is_blocked: bool,
}
