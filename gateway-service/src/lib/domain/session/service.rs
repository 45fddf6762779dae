use std::sync::Arc;

use chrono::Duration;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::AuthenticatedLink;
use crate::domain::session::models::ChatRecord;
use crate::domain::session::models::GuestSession;
use crate::domain::session::models::SessionStatus;
use crate::domain::session::ports::SessionStore;
use crate::domain::user::models::UserId;

/// Expired sessions linger this long before the sweep removes them.
const SWEEP_GRACE_MINUTES: i64 = 60;

/// Guest session lifecycle: creation, validation with TTL refresh, state
/// transitions, and the maintenance sweep.
pub struct SessionService<S>
where
    S: SessionStore,
{
    store: Arc<S>,
    ttl_minutes: i64,
}

impl<S> SessionService<S>
where
    S: SessionStore,
{
    pub fn new(store: Arc<S>, ttl_minutes: i64) -> Self {
        Self { store, ttl_minutes }
    }

    /// Create a fresh guest session with an opaque token.
    pub async fn create_session(&self) -> Result<GuestSession, SessionError> {
        let mut token_bytes = [0u8; 8];
        OsRng.fill_bytes(&mut token_bytes);

        let now = Utc::now();
        let session = GuestSession {
            session_id: format!("guest_{}", hex::encode(token_bytes)),
            status: SessionStatus::Active,
            created_at: now,
            expires_at: now + Duration::minutes(self.ttl_minutes),
            last_activity: now,
        };

        let session = self.store.create(session).await?;
        tracing::info!(session_id = %session.session_id, "Guest session created");
        Ok(session)
    }

    /// Validate a session token and refresh its TTL.
    ///
    /// # Errors
    /// * `NotFound` - No such session
    /// * `Expired` - The session's TTL has passed
    pub async fn validate(&self, session_id: &str) -> Result<GuestSession, SessionError> {
        let session = self
            .store
            .find(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let now = Utc::now();
        if session.is_expired(now) || session.status == SessionStatus::Expired {
            return Err(SessionError::Expired(session_id.to_string()));
        }

        let refreshed = now + Duration::minutes(self.ttl_minutes);
        self.store.touch(session_id, refreshed).await?;

        Ok(session)
    }

    pub async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<(), SessionError> {
        tracing::debug!(session_id, status = %status, "Session status transition");
        self.store.update_status(session_id, status).await
    }

    pub async fn link_authenticated_user(
        &self,
        session_id: &str,
        user_id: UserId,
    ) -> Result<(), SessionError> {
        self.store
            .link_authenticated_user(session_id, user_id)
            .await?;
        self.store
            .update_status(session_id, SessionStatus::Authenticated)
            .await
    }

    pub async fn find_authenticated_user(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthenticatedLink>, SessionError> {
        self.store.find_authenticated_user(session_id).await
    }

    /// Record a chat exchange. History is a non-critical path: failures are
    /// logged and swallowed, never surfaced to the guest.
    pub async fn record_chat(&self, record: ChatRecord) {
        if let Err(e) = self.store.record_chat(record).await {
            tracing::warn!(error = %e, "Failed to record chat history");
        }
    }

    /// Maintenance sweep: remove sessions that expired over an hour ago.
    pub async fn sweep_expired(&self) -> Result<u64, SessionError> {
        let removed = self.store.delete_expired(SWEEP_GRACE_MINUTES).await?;
        if removed > 0 {
            tracing::info!(removed, "Swept expired guest sessions");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::DateTime;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;

    mock! {
        pub TestSessionStore {}

        #[async_trait]
        impl SessionStore for TestSessionStore {
            async fn create(&self, session: GuestSession) -> Result<GuestSession, SessionError>;
            async fn find(&self, session_id: &str) -> Result<Option<GuestSession>, SessionError>;
            async fn touch(&self, session_id: &str, expires_at: DateTime<Utc>) -> Result<(), SessionError>;
            async fn update_status(&self, session_id: &str, status: SessionStatus) -> Result<(), SessionError>;
            async fn link_authenticated_user(&self, session_id: &str, user_id: UserId) -> Result<(), SessionError>;
            async fn find_authenticated_user(&self, session_id: &str) -> Result<Option<AuthenticatedLink>, SessionError>;
            async fn record_chat(&self, record: ChatRecord) -> Result<(), SessionError>;
            async fn delete_expired(&self, grace_minutes: i64) -> Result<u64, SessionError>;
        }
    }

    fn live_session(session_id: &str) -> GuestSession {
        let now = Utc::now();
        GuestSession {
            session_id: session_id.to_string(),
            status: SessionStatus::Active,
            created_at: now,
            expires_at: now + Duration::minutes(30),
            last_activity: now,
        }
    }

    #[tokio::test]
    async fn test_create_session_generates_opaque_token() {
        let mut store = MockTestSessionStore::new();
        store
            .expect_create()
            .withf(|session| {
                session.session_id.starts_with("guest_")
                    && session.status == SessionStatus::Active
            })
            .times(1)
            .returning(|session| Ok(session));

        let service = SessionService::new(Arc::new(store), 60);
        let session = service.create_session().await.unwrap();

        assert!(session.session_id.starts_with("guest_"));
        assert!(session.expires_at > session.created_at);
    }

    #[tokio::test]
    async fn test_validate_refreshes_ttl() {
        let mut store = MockTestSessionStore::new();
        let session = live_session("guest_aa");
        let returned = session.clone();

        store
            .expect_find()
            .with(eq("guest_aa"))
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        store
            .expect_touch()
            .withf(|id, expires_at| id == "guest_aa" && *expires_at > Utc::now())
            .times(1)
            .returning(|_, _| Ok(()));

        let service = SessionService::new(Arc::new(store), 60);
        let validated = service.validate("guest_aa").await.unwrap();
        assert_eq!(validated.session_id, "guest_aa");
    }

    #[tokio::test]
    async fn test_validate_rejects_expired_session() {
        let mut store = MockTestSessionStore::new();
        let mut session = live_session("guest_old");
        session.expires_at = Utc::now() - Duration::minutes(5);

        store
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(session.clone())));
        store.expect_touch().times(0);

        let service = SessionService::new(Arc::new(store), 60);
        let result = service.validate("guest_old").await;
        assert!(matches!(result, Err(SessionError::Expired(_))));
    }

    #[tokio::test]
    async fn test_validate_rejects_unknown_session() {
        let mut store = MockTestSessionStore::new();
        store.expect_find().times(1).returning(|_| Ok(None));

        let service = SessionService::new(Arc::new(store), 60);
        let result = service.validate("guest_missing").await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_record_chat_swallows_store_errors() {
        let mut store = MockTestSessionStore::new();
        store
            .expect_record_chat()
            .times(1)
            .returning(|_| Err(SessionError::DatabaseError("down".into())));

        let service = SessionService::new(Arc::new(store), 60);
        // Must not panic or propagate
        service
            .record_chat(ChatRecord::new(
                "guest_aa",
                "hi",
                "hello",
                SessionStatus::Active,
                "general",
            ))
            .await;
    }

    #[tokio::test]
    async fn test_link_authenticated_user_marks_session() {
        let mut store = MockTestSessionStore::new();
        let user_id = UserId::new();

        store
            .expect_link_authenticated_user()
            .withf(move |id, uid| id == "guest_aa" && *uid == user_id)
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_update_status()
            .with(eq("guest_aa"), eq(SessionStatus::Authenticated))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = SessionService::new(Arc::new(store), 60);
        service
            .link_authenticated_user("guest_aa", user_id)
            .await
            .unwrap();
    }
}
