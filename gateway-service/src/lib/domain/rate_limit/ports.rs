use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::rate_limit::errors::RateLimitError;
use crate::domain::rate_limit::models::IdentifierKind;
use crate::domain::rate_limit::models::RateLimitDecision;
use crate::domain::rate_limit::models::RateLimitStatus;
use crate::domain::rate_limit::models::WindowSample;

/// Persistence for per-identifier request counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync + 'static {
    /// Read the counter row for an identifier; returns an empty sample when
    /// no row exists or the window has rolled past `window_minutes`.
    async fn sample(
        &self,
        identifier: &str,
        kind: IdentifierKind,
        window_minutes: i64,
    ) -> Result<WindowSample, RateLimitError>;

    /// Atomically count one request: a single upsert that starts a new
    /// window when the previous one rolled over, otherwise increments.
    /// Returns the request count inside the current window.
    async fn record(
        &self,
        identifier: &str,
        kind: IdentifierKind,
        window_minutes: i64,
    ) -> Result<u32, RateLimitError>;

    /// Stamp the end of the block on the counter row.
    async fn set_block(
        &self,
        identifier: &str,
        kind: IdentifierKind,
        blocked_until: DateTime<Utc>,
    ) -> Result<(), RateLimitError>;

    /// Remove the counter row for one identifier.
    async fn clear(&self, identifier: &str, kind: IdentifierKind) -> Result<(), RateLimitError>;

    /// Remove stale rows whose last request predates `cutoff` and whose
    /// block, if any, has passed. Returns rows removed.
    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, RateLimitError>;
}

/// OTP request throttling per contact identifier.
#[async_trait]
pub trait RateLimiterPort: Send + Sync + 'static {
    /// Check whether another OTP request is allowed right now.
    ///
    /// Fails open: a storage error is logged and the request allowed.
    /// Availability wins for this control, unlike OTP hashing which must
    /// never fail open.
    async fn check(&self, identifier: &str, kind: IdentifierKind) -> RateLimitDecision;

    /// Count one OTP generation. Called exactly once per generated code,
    /// never per verification. Errors are logged, not propagated.
    async fn record(&self, identifier: &str, kind: IdentifierKind);

    /// Administrative escape hatch: wipe the counters for one identifier.
    /// Never routed to a guest-facing endpoint.
    async fn reset(&self, identifier: &str, kind: IdentifierKind) -> Result<(), RateLimitError>;

    /// Current quota status without counting a request.
    async fn status(
        &self,
        identifier: &str,
        kind: IdentifierKind,
    ) -> Result<RateLimitStatus, RateLimitError>;
}
