use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::otp::models::OtpChannel;
use crate::domain::session::models::SessionStatus;
use crate::domain::user::models::UserId;
use crate::domain::wizard::errors::TaskError;
use crate::domain::wizard::errors::TempRecordError;
use crate::domain::wizard::models::AuthTempRecord;
use crate::domain::wizard::models::Intent;
use crate::domain::wizard::models::TicketPriority;

/// Persistence for the per-session auth scratch record.
///
/// Every write is an upsert keyed by session id and refreshes the record's
/// expiry; the record dies with the wizard (success or restart).
#[async_trait]
pub trait AuthTempRepository: Send + Sync + 'static {
    /// Stash the intent and query that triggered the wizard, so the task
    /// can resume after authentication.
    async fn stash_intent(
        &self,
        session_id: &str,
        intent: Intent,
        query: &str,
    ) -> Result<(), TempRecordError>;

    /// Record the parsed name from step 1.
    async fn save_names(
        &self,
        session_id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), TempRecordError>;

    /// Record DOB and contact details from step 2.
    async fn save_dob_contact(
        &self,
        session_id: &str,
        dob: NaiveDate,
        email: Option<&str>,
        phone: Option<&str>,
        channel: OtpChannel,
    ) -> Result<(), TempRecordError>;

    /// Link an existing user (or None to defer creation to OTP success).
    async fn save_user_link(
        &self,
        session_id: &str,
        user_id: Option<UserId>,
    ) -> Result<(), TempRecordError>;

    /// Park or clear the wizard step for pause/resume.
    async fn set_paused_state(
        &self,
        session_id: &str,
        state: Option<SessionStatus>,
    ) -> Result<(), TempRecordError>;

    async fn find(&self, session_id: &str) -> Result<Option<AuthTempRecord>, TempRecordError>;

    async fn delete(&self, session_id: &str) -> Result<(), TempRecordError>;

    /// Remove expired scratch records. Returns rows removed.
    async fn delete_expired(&self) -> Result<u64, TempRecordError>;
}

/// External chatbot collaborator: intent classification and general-purpose
/// answers. The real implementation sits in front of an LLM; the shipped
/// one is keyword-based.
#[async_trait]
pub trait ChatAssistant: Send + Sync + 'static {
    async fn classify(&self, query: &str) -> Intent;

    async fn answer_info(&self, query: &str) -> String;
}

/// Follow-on task records created once a guest is authenticated.
#[async_trait]
pub trait TaskRepository: Send + Sync + 'static {
    async fn create_appointment(
        &self,
        user_id: UserId,
        booking_id: &str,
        appointment_type: &str,
        details: &str,
    ) -> Result<(), TaskError>;

    async fn create_ticket(
        &self,
        user_id: UserId,
        ticket_id: &str,
        ticket_type: &str,
        priority: TicketPriority,
        description: &str,
    ) -> Result<(), TaskError>;
}
