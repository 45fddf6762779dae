use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::AuthenticatedLink;
use crate::domain::session::models::ChatRecord;
use crate::domain::session::models::GuestSession;
use crate::domain::session::models::SessionStatus;
use crate::domain::user::models::UserId;

/// Persistence for guest sessions, their authenticated-user links, and the
/// chat history.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Persist a new guest session.
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, session: GuestSession) -> Result<GuestSession, SessionError>;

    /// Retrieve a session by token.
    ///
    /// Returns the row regardless of expiry; callers decide what an expired
    /// row means.
    async fn find(&self, session_id: &str) -> Result<Option<GuestSession>, SessionError>;

    /// Refresh activity and push the expiry forward.
    async fn touch(&self, session_id: &str, expires_at: DateTime<Utc>)
        -> Result<(), SessionError>;

    /// Move the session to a new wizard state.
    async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<(), SessionError>;

    /// Upsert the session → verified-user link created at OTP success.
    async fn link_authenticated_user(
        &self,
        session_id: &str,
        user_id: UserId,
    ) -> Result<(), SessionError>;

    /// Fetch the verified-user link, if the session has authenticated.
    async fn find_authenticated_user(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthenticatedLink>, SessionError>;

    /// Append one exchange to the chat history.
    async fn record_chat(&self, record: ChatRecord) -> Result<(), SessionError>;

    /// Delete sessions whose expiry passed more than `grace_minutes` ago,
    /// with their orphaned links. Returns the number of sessions removed.
    async fn delete_expired(&self, grace_minutes: i64) -> Result<u64, SessionError>;
}
