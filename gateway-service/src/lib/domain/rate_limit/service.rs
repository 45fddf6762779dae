use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use chrono::Utc;

use crate::domain::rate_limit::errors::RateLimitError;
use crate::domain::rate_limit::models::IdentifierKind;
use crate::domain::rate_limit::models::RateLimitDecision;
use crate::domain::rate_limit::models::RateLimitStatus;
use crate::domain::rate_limit::ports::RateLimitRepository;
use crate::domain::rate_limit::ports::RateLimiterPort;

/// Blocked callers always wait at least this long.
const MIN_RETRY_AFTER_SECONDS: i64 = 60;

/// Sliding-window OTP request limiter.
///
/// Counts generations per `(identifier, kind)` inside a trailing window.
/// Once the threshold is hit the identifier is blocked until the window
/// that produced the violation ends; the wait is measured from the first
/// request in that window, not from "now".
pub struct RateLimiter<R>
where
    R: RateLimitRepository,
{
    repository: Arc<R>,
    max_requests: u32,
    window_minutes: i64,
}

impl<R> RateLimiter<R>
where
    R: RateLimitRepository,
{
    pub fn new(repository: Arc<R>, max_requests: u32, window_minutes: i64) -> Self {
        Self {
            repository,
            max_requests,
            window_minutes,
        }
    }

    /// Maintenance: drop counter rows idle for over 24 hours.
    pub async fn purge_stale(&self) -> Result<u64, RateLimitError> {
        let cutoff = Utc::now() - Duration::hours(24);
        self.repository.delete_stale(cutoff).await
    }

    fn retry_after(&self, window_started_at: chrono::DateTime<Utc>) -> i64 {
        let window_end = window_started_at + Duration::minutes(self.window_minutes);
        let remaining = (window_end - Utc::now()).num_seconds();
        remaining.max(MIN_RETRY_AFTER_SECONDS)
    }
}

#[async_trait]
impl<R> RateLimiterPort for RateLimiter<R>
where
    R: RateLimitRepository,
{
    async fn check(&self, identifier: &str, kind: IdentifierKind) -> RateLimitDecision {
        let sample = match self
            .repository
            .sample(identifier, kind, self.window_minutes)
            .await
        {
            Ok(sample) => sample,
            Err(e) => {
                // Fail open: do not lock legitimate users out because the
                // counter store is unavailable.
                tracing::warn!(identifier, error = %e, "Rate limit check failed, allowing request");
                return RateLimitDecision::Allowed {
                    requests_used: 0,
                    requests_remaining: self.max_requests,
                };
            }
        };

        let now = Utc::now();
        if let Some(blocked_until) = sample.blocked_until {
            if blocked_until > now {
                return RateLimitDecision::Blocked {
                    retry_after_seconds: (blocked_until - now)
                        .num_seconds()
                        .max(MIN_RETRY_AFTER_SECONDS),
                };
            }
        }

        if sample.request_count >= self.max_requests {
            let window_start = sample.window_started_at.unwrap_or(now);
            let blocked_until = window_start + Duration::minutes(self.window_minutes);

            if let Err(e) = self
                .repository
                .set_block(identifier, kind, blocked_until)
                .await
            {
                tracing::warn!(identifier, error = %e, "Failed to persist rate-limit block");
            }

            return RateLimitDecision::Blocked {
                retry_after_seconds: self.retry_after(window_start),
            };
        }

        RateLimitDecision::Allowed {
            requests_used: sample.request_count,
            requests_remaining: self.max_requests - sample.request_count,
        }
    }

    async fn record(&self, identifier: &str, kind: IdentifierKind) {
        match self
            .repository
            .record(identifier, kind, self.window_minutes)
            .await
        {
            Ok(count) => {
                tracing::debug!(identifier, kind = %kind, count, "Recorded OTP request");
            }
            Err(e) => {
                tracing::warn!(identifier, error = %e, "Failed to record OTP request");
            }
        }
    }

    async fn reset(&self, identifier: &str, kind: IdentifierKind) -> Result<(), RateLimitError> {
        tracing::info!(identifier, kind = %kind, "Rate limit reset");
        self.repository.clear(identifier, kind).await
    }

    async fn status(
        &self,
        identifier: &str,
        kind: IdentifierKind,
    ) -> Result<RateLimitStatus, RateLimitError> {
        let sample = self
            .repository
            .sample(identifier, kind, self.window_minutes)
            .await?;

        let now = Utc::now();
        let is_blocked = sample.request_count >= self.max_requests
            || sample.blocked_until.is_some_and(|until| until > now);

        let reset_in_seconds = if is_blocked {
            sample
                .window_started_at
                .map(|start| {
                    ((start + Duration::minutes(self.window_minutes)) - now)
                        .num_seconds()
                        .max(0)
                })
                .unwrap_or(0)
        } else {
            0
        };

        Ok(RateLimitStatus {
            identifier: identifier.to_string(),
            current_count: sample.request_count,
            max_requests: self.max_requests,
            remaining: self.max_requests.saturating_sub(sample.request_count),
            reset_in_seconds,
            is_blocked,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::domain::rate_limit::models::WindowSample;

    mock! {
        pub TestRateLimitRepository {}

        #[async_trait]
        impl RateLimitRepository for TestRateLimitRepository {
            async fn sample(&self, identifier: &str, kind: IdentifierKind, window_minutes: i64) -> Result<WindowSample, RateLimitError>;
            async fn record(&self, identifier: &str, kind: IdentifierKind, window_minutes: i64) -> Result<u32, RateLimitError>;
            async fn set_block(&self, identifier: &str, kind: IdentifierKind, blocked_until: DateTime<Utc>) -> Result<(), RateLimitError>;
            async fn clear(&self, identifier: &str, kind: IdentifierKind) -> Result<(), RateLimitError>;
            async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, RateLimitError>;
        }
    }

    fn limiter(repository: MockTestRateLimitRepository) -> RateLimiter<MockTestRateLimitRepository> {
        RateLimiter::new(Arc::new(repository), 5, 60)
    }

    #[tokio::test]
    async fn test_fifth_request_allowed_sixth_blocked() {
        // Four requests used: the fifth is allowed.
        let mut repository = MockTestRateLimitRepository::new();
        repository.expect_sample().times(1).returning(|_, _, _| {
            Ok(WindowSample {
                request_count: 4,
                window_started_at: Some(Utc::now() - Duration::minutes(10)),
                blocked_until: None,
            })
        });

        let decision = limiter(repository).check("+15551112222", IdentifierKind::Phone).await;
        assert_eq!(
            decision,
            RateLimitDecision::Allowed {
                requests_used: 4,
                requests_remaining: 1
            }
        );

        // Five requests used: the sixth is blocked with a positive wait.
        let mut repository = MockTestRateLimitRepository::new();
        repository.expect_sample().times(1).returning(|_, _, _| {
            Ok(WindowSample {
                request_count: 5,
                window_started_at: Some(Utc::now() - Duration::minutes(10)),
                blocked_until: None,
            })
        });
        repository
            .expect_set_block()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let decision = limiter(repository).check("+15551112222", IdentifierKind::Phone).await;
        match decision {
            RateLimitDecision::Blocked {
                retry_after_seconds,
            } => {
                assert!(retry_after_seconds > 0);
                // ~50 minutes of the window remain
                assert!(retry_after_seconds <= 50 * 60);
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retry_after_measured_from_oldest_request() {
        // Window nearly over: the wait is short but floored at 60s.
        let mut repository = MockTestRateLimitRepository::new();
        repository.expect_sample().times(1).returning(|_, _, _| {
            Ok(WindowSample {
                request_count: 5,
                window_started_at: Some(Utc::now() - Duration::minutes(59)),
                blocked_until: None,
            })
        });
        repository
            .expect_set_block()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let decision = limiter(repository).check("a@b.com", IdentifierKind::Email).await;
        assert_eq!(
            decision,
            RateLimitDecision::Blocked {
                retry_after_seconds: 60
            }
        );
    }

    #[tokio::test]
    async fn test_rolled_over_window_allows_again() {
        let mut repository = MockTestRateLimitRepository::new();
        // The repository reports an empty sample once the window has passed.
        repository
            .expect_sample()
            .times(1)
            .returning(|_, _, _| Ok(WindowSample::empty()));

        let decision = limiter(repository).check("a@b.com", IdentifierKind::Email).await;
        assert_eq!(
            decision,
            RateLimitDecision::Allowed {
                requests_used: 0,
                requests_remaining: 5
            }
        );
    }

    #[tokio::test]
    async fn test_check_fails_open_on_storage_error() {
        let mut repository = MockTestRateLimitRepository::new();
        repository
            .expect_sample()
            .times(1)
            .returning(|_, _, _| Err(RateLimitError::DatabaseError("down".into())));

        let decision = limiter(repository).check("a@b.com", IdentifierKind::Email).await;
        assert!(matches!(decision, RateLimitDecision::Allowed { .. }));
    }

    #[tokio::test]
    async fn test_active_block_short_circuits() {
        let mut repository = MockTestRateLimitRepository::new();
        repository.expect_sample().times(1).returning(|_, _, _| {
            Ok(WindowSample {
                request_count: 5,
                window_started_at: Some(Utc::now() - Duration::minutes(5)),
                blocked_until: Some(Utc::now() + Duration::minutes(30)),
            })
        });
        // No new set_block call while a block is active
        repository.expect_set_block().times(0);

        let decision = limiter(repository).check("a@b.com", IdentifierKind::Email).await;
        assert!(matches!(decision, RateLimitDecision::Blocked { .. }));
    }

    #[tokio::test]
    async fn test_status_reports_quota() {
        let mut repository = MockTestRateLimitRepository::new();
        repository.expect_sample().times(1).returning(|_, _, _| {
            Ok(WindowSample {
                request_count: 2,
                window_started_at: Some(Utc::now() - Duration::minutes(10)),
                blocked_until: None,
            })
        });

        let status = limiter(repository)
            .status("a@b.com", IdentifierKind::Email)
            .await
            .unwrap();
        assert_eq!(status.current_count, 2);
        assert_eq!(status.remaining, 3);
        assert!(!status.is_blocked);
        assert_eq!(status.reset_in_seconds, 0);
    }
}
