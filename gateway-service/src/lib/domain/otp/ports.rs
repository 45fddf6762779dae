use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::otp::errors::DeliveryError;
use crate::domain::otp::errors::OtpError;
use crate::domain::otp::models::ContactMethod;
use crate::domain::otp::models::OtpRequest;
use crate::domain::otp::models::OtpRequestOutcome;
use crate::domain::otp::models::OtpStats;
use crate::domain::otp::models::OtpStatus;
use crate::domain::otp::models::OtpVerifyOutcome;
use crate::domain::otp::models::VerifiedContact;

/// Persistence for OTP request rows.
#[async_trait]
pub trait OtpRepository: Send + Sync + 'static {
    /// Store a new request, expiring any still-pending request for the same
    /// session in the same transaction. At most one pending row per session
    /// exists afterwards.
    async fn create_replacing_pending(&self, request: OtpRequest) -> Result<(), OtpError>;

    /// Fetch a request by id if it is still pending.
    async fn find_pending(&self, otp_id: &str) -> Result<Option<OtpRequest>, OtpError>;

    /// Fetch the newest pending request for a session.
    async fn find_pending_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<OtpRequest>, OtpError>;

    /// Move a request to a terminal status.
    async fn set_status(&self, otp_id: &str, status: OtpStatus) -> Result<(), OtpError>;

    /// Mark a request verified and stamp `verified_at`.
    async fn mark_verified(&self, otp_id: &str) -> Result<(), OtpError>;

    /// Atomically consume one attempt; returns the attempts left afterwards.
    async fn decrement_attempts(&self, otp_id: &str) -> Result<i32, OtpError>;

    /// Expire every pending request for a session. Returns rows affected.
    async fn expire_pending_for_session(&self, session_id: &str) -> Result<u64, OtpError>;

    /// Newest verified request for a session, if any.
    async fn latest_verified_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<OtpRequest>, OtpError>;

    /// 24-hour counters for one identifier.
    async fn stats_for_identifier(
        &self,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> Result<OtpStats, OtpError>;

    /// Drop rows created before `cutoff`. Returns rows removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, OtpError>;
}

/// Delivery boundary: "send this code to this identifier over this channel".
/// Real SMTP/SMS integration lives behind this trait and out of scope.
#[async_trait]
pub trait OtpDelivery: Send + Sync + 'static {
    async fn send_code(
        &self,
        contact: &ContactMethod,
        code: &str,
        session_id: &str,
    ) -> Result<(), DeliveryError>;
}

/// OTP operations as consumed by the wizard and the standalone endpoints.
#[async_trait]
pub trait OtpServicePort: Send + Sync + 'static {
    /// Generate, store, and dispatch a fresh code for a session.
    ///
    /// `attempts` is 1 for the chat wizard and higher for the standalone
    /// API. Rate limiting is checked first; the limiter is recorded against
    /// exactly once per generated code.
    async fn request_code(
        &self,
        session_id: &str,
        contact: &ContactMethod,
        attempts: i32,
    ) -> Result<OtpRequestOutcome, OtpError>;

    /// Single-attempt verification against the session's pending code.
    /// Any well-formed submission retires the code, success or failure.
    async fn verify_pending(
        &self,
        session_id: &str,
        submitted: &str,
    ) -> Result<OtpVerifyOutcome, OtpError>;

    /// Multi-attempt verification by otp id (standalone API).
    async fn verify_code(
        &self,
        otp_id: &str,
        session_id: &str,
        submitted: &str,
    ) -> Result<OtpVerifyOutcome, OtpError>;

    /// Cancel a pending code. Returns false when no matching pending code
    /// exists for this session.
    async fn cancel(&self, otp_id: &str, session_id: &str) -> Result<bool, OtpError>;

    /// Expire the session's pending code (restart cleanup). Returns rows
    /// affected.
    async fn retire_pending(&self, session_id: &str) -> Result<u64, OtpError>;

    /// Contact method this session has proven, if any.
    async fn verified_contact(&self, session_id: &str)
        -> Result<Option<VerifiedContact>, OtpError>;

    /// 24-hour request counters for an identifier.
    async fn stats(&self, contact: &ContactMethod) -> Result<OtpStats, OtpError>;
}
