use std::sync::Arc;

use async_trait::async_trait;
use auth::OtpEngine;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::otp::errors::OtpError;
use crate::domain::otp::models::ContactMethod;
use crate::domain::otp::models::OtpRejection;
use crate::domain::otp::models::OtpRequest;
use crate::domain::otp::models::OtpRequestOutcome;
use crate::domain::otp::models::OtpStats;
use crate::domain::otp::models::OtpStatus;
use crate::domain::otp::models::OtpVerifyOutcome;
use crate::domain::otp::models::VerifiedContact;
use crate::domain::otp::ports::OtpDelivery;
use crate::domain::otp::ports::OtpRepository;
use crate::domain::otp::ports::OtpServicePort;
use crate::domain::rate_limit::models::RateLimitDecision;
use crate::domain::rate_limit::ports::RateLimiterPort;

/// OTP request lifecycle: rate check → retire previous → generate → store →
/// record quota → deliver, and the two verification flavors.
///
/// Everything here is a critical path and fails closed: a storage error is
/// an error, never a silent success.
pub struct OtpService<R, L, D>
where
    R: OtpRepository,
    L: RateLimiterPort,
    D: OtpDelivery,
{
    repository: Arc<R>,
    rate_limiter: Arc<L>,
    delivery: Arc<D>,
    engine: OtpEngine,
    validity_minutes: i64,
}

impl<R, L, D> OtpService<R, L, D>
where
    R: OtpRepository,
    L: RateLimiterPort,
    D: OtpDelivery,
{
    pub fn new(
        repository: Arc<R>,
        rate_limiter: Arc<L>,
        delivery: Arc<D>,
        validity_minutes: i64,
    ) -> Self {
        Self {
            repository,
            rate_limiter,
            delivery,
            engine: OtpEngine::new(),
            validity_minutes,
        }
    }

    /// Maintenance: drop OTP rows older than 24 hours.
    pub async fn purge_stale(&self) -> Result<u64, OtpError> {
        let cutoff = Utc::now() - Duration::hours(24);
        self.repository.delete_older_than(cutoff).await
    }

    fn new_otp_id() -> String {
        let mut bytes = [0u8; 8];
        OsRng.fill_bytes(&mut bytes);
        format!("otp_{}", hex::encode(bytes))
    }

    /// Shared rejection path: move the code to a terminal status and report
    /// why. The status write must succeed: a code that cannot be retired
    /// must not be reported as consumed.
    async fn retire(
        &self,
        otp_id: &str,
        status: OtpStatus,
        reason: OtpRejection,
    ) -> Result<OtpVerifyOutcome, OtpError> {
        self.repository.set_status(otp_id, status).await?;
        Ok(OtpVerifyOutcome::Rejected {
            reason,
            attempts_remaining: 0,
        })
    }

    async fn check_liveness(
        &self,
        request: &OtpRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<OtpVerifyOutcome>, OtpError> {
        if request.is_expired(now) {
            return self
                .retire(&request.otp_id, OtpStatus::Expired, OtpRejection::Expired)
                .await
                .map(Some);
        }

        if request.attempts_left <= 0 {
            return self
                .retire(
                    &request.otp_id,
                    OtpStatus::Blocked,
                    OtpRejection::AttemptsExhausted,
                )
                .await
                .map(Some);
        }

        Ok(None)
    }
}

#[async_trait]
impl<R, L, D> OtpServicePort for OtpService<R, L, D>
where
    R: OtpRepository,
    L: RateLimiterPort,
    D: OtpDelivery,
{
    async fn request_code(
        &self,
        session_id: &str,
        contact: &ContactMethod,
        attempts: i32,
    ) -> Result<OtpRequestOutcome, OtpError> {
        let decision = self
            .rate_limiter
            .check(contact.as_str(), contact.kind())
            .await;

        let requests_remaining = match decision {
            RateLimitDecision::Blocked {
                retry_after_seconds,
            } => {
                tracing::info!(
                    identifier = contact.as_str(),
                    retry_after_seconds,
                    "OTP request rate limited"
                );
                return Ok(OtpRequestOutcome::RateLimited {
                    retry_after_seconds,
                });
            }
            // The slot this request is about to use is already spoken for.
            RateLimitDecision::Allowed {
                requests_remaining, ..
            } => requests_remaining.saturating_sub(1),
        };

        let generated = self.engine.generate();
        let now = Utc::now();
        let request = OtpRequest {
            otp_id: Self::new_otp_id(),
            session_id: session_id.to_string(),
            identifier: contact.as_str().to_string(),
            channel: contact.channel(),
            otp_hash: generated.hash,
            salt: generated.salt,
            expires_at: now + Duration::minutes(self.validity_minutes),
            attempts_left: attempts,
            status: OtpStatus::Pending,
            created_at: now,
            verified_at: None,
        };
        let otp_id = request.otp_id.clone();
        let channel = request.channel;

        self.repository.create_replacing_pending(request).await?;

        // Exactly once per generated code, never per verification.
        self.rate_limiter
            .record(contact.as_str(), contact.kind())
            .await;

        if let Err(e) = self
            .delivery
            .send_code(contact, &generated.code, session_id)
            .await
        {
            tracing::warn!(
                identifier = contact.as_str(),
                otp_id,
                error = %e,
                "OTP delivery failed, code left pending for resend"
            );
            return Ok(OtpRequestOutcome::DeliveryFailed { otp_id });
        }

        tracing::info!(
            identifier = contact.as_str(),
            channel = %channel,
            otp_id,
            "OTP generated and dispatched"
        );

        Ok(OtpRequestOutcome::Sent {
            otp_id,
            channel,
            expires_in_minutes: self.validity_minutes,
            requests_remaining,
        })
    }

    async fn verify_pending(
        &self,
        session_id: &str,
        submitted: &str,
    ) -> Result<OtpVerifyOutcome, OtpError> {
        let Some(request) = self.repository.find_pending_for_session(session_id).await? else {
            return Ok(OtpVerifyOutcome::Rejected {
                reason: OtpRejection::NoActiveCode,
                attempts_remaining: 0,
            });
        };

        if let Some(outcome) = self.check_liveness(&request, Utc::now()).await? {
            return Ok(outcome);
        }

        // Malformed input is a validation error, not an attempt.
        let Ok(matches) = self
            .engine
            .verify(submitted, &request.otp_hash, &request.salt)
        else {
            return Ok(OtpVerifyOutcome::Rejected {
                reason: OtpRejection::InvalidFormat,
                attempts_remaining: request.attempts_left,
            });
        };

        // Single-attempt policy: the code is retired either way. A second
        // submission against this id finds nothing pending.
        if matches {
            self.repository.mark_verified(&request.otp_id).await?;
            tracing::info!(
                identifier = request.identifier,
                channel = %request.channel,
                "OTP verified"
            );
            Ok(OtpVerifyOutcome::Verified {
                otp_id: request.otp_id,
                identifier: request.identifier,
                channel: request.channel,
            })
        } else {
            tracing::warn!(identifier = request.identifier, "OTP mismatch, code retired");
            self.retire(&request.otp_id, OtpStatus::Expired, OtpRejection::Mismatch)
                .await
        }
    }

    async fn verify_code(
        &self,
        otp_id: &str,
        session_id: &str,
        submitted: &str,
    ) -> Result<OtpVerifyOutcome, OtpError> {
        let Some(request) = self.repository.find_pending(otp_id).await? else {
            return Ok(OtpVerifyOutcome::Rejected {
                reason: OtpRejection::NoActiveCode,
                attempts_remaining: 0,
            });
        };

        if request.session_id != session_id {
            tracing::warn!(otp_id, "OTP verification session mismatch");
            return Ok(OtpVerifyOutcome::Rejected {
                reason: OtpRejection::SessionMismatch,
                attempts_remaining: request.attempts_left,
            });
        }

        if let Some(outcome) = self.check_liveness(&request, Utc::now()).await? {
            return Ok(outcome);
        }

        let Ok(matches) = self
            .engine
            .verify(submitted, &request.otp_hash, &request.salt)
        else {
            return Ok(OtpVerifyOutcome::Rejected {
                reason: OtpRejection::InvalidFormat,
                attempts_remaining: request.attempts_left,
            });
        };

        let remaining = self.repository.decrement_attempts(otp_id).await?;

        if matches {
            self.repository.mark_verified(otp_id).await?;
            Ok(OtpVerifyOutcome::Verified {
                otp_id: request.otp_id,
                identifier: request.identifier,
                channel: request.channel,
            })
        } else if remaining <= 0 {
            self.retire(otp_id, OtpStatus::Blocked, OtpRejection::AttemptsExhausted)
                .await
        } else {
            Ok(OtpVerifyOutcome::Rejected {
                reason: OtpRejection::Mismatch,
                attempts_remaining: remaining,
            })
        }
    }

    async fn cancel(&self, otp_id: &str, session_id: &str) -> Result<bool, OtpError> {
        let Some(request) = self.repository.find_pending(otp_id).await? else {
            return Ok(false);
        };

        if request.session_id != session_id {
            return Ok(false);
        }

        self.repository
            .set_status(otp_id, OtpStatus::Cancelled)
            .await?;
        tracing::info!(otp_id, "OTP cancelled");
        Ok(true)
    }

    async fn retire_pending(&self, session_id: &str) -> Result<u64, OtpError> {
        self.repository.expire_pending_for_session(session_id).await
    }

    async fn verified_contact(
        &self,
        session_id: &str,
    ) -> Result<Option<VerifiedContact>, OtpError> {
        let request = self
            .repository
            .latest_verified_for_session(session_id)
            .await?;

        Ok(request.map(|r| VerifiedContact {
            identifier: r.identifier,
            channel: r.channel,
            verified_at: r.verified_at.unwrap_or(r.created_at),
        }))
    }

    async fn stats(&self, contact: &ContactMethod) -> Result<OtpStats, OtpError> {
        let since = Utc::now() - Duration::hours(24);
        self.repository
            .stats_for_identifier(contact.as_str(), since)
            .await
    }
}
