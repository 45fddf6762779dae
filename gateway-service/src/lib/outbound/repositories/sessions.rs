use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::AuthenticatedLink;
use crate::domain::session::models::ChatRecord;
use crate::domain::session::models::GuestSession;
use crate::domain::session::models::SessionStatus;
use crate::domain::session::ports::SessionStore;
use crate::domain::user::models::UserId;

pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_session(row: &PgRow) -> Result<GuestSession, SessionError> {
        let status: String = row
            .try_get("status")
            .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(GuestSession {
            session_id: row
                .try_get("session_id")
                .map_err(|e| SessionError::DatabaseError(e.to_string()))?,
            status: status.parse()?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| SessionError::DatabaseError(e.to_string()))?,
            expires_at: row
                .try_get("expires_at")
                .map_err(|e| SessionError::DatabaseError(e.to_string()))?,
            last_activity: row
                .try_get("last_activity")
                .map_err(|e| SessionError::DatabaseError(e.to_string()))?,
        })
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, session: GuestSession) -> Result<GuestSession, SessionError> {
        sqlx::query(
            r#"
            INSERT INTO guest_sessions (session_id, status, created_at, expires_at, last_activity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&session.session_id)
        .bind(session.status.as_str())
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.last_activity)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(session)
    }

    async fn find(&self, session_id: &str) -> Result<Option<GuestSession>, SessionError> {
        let row = sqlx::query(
            r#"
            SELECT session_id, status, created_at, expires_at, last_activity
            FROM guest_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn touch(
        &self,
        session_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            UPDATE guest_sessions
            SET last_activity = CURRENT_TIMESTAMP, expires_at = $2
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<(), SessionError> {
        let result = sqlx::query(
            r#"
            UPDATE guest_sessions
            SET status = $2, last_activity = CURRENT_TIMESTAMP
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SessionError::NotFound(session_id.to_string()));
        }

        Ok(())
    }

    async fn link_authenticated_user(
        &self,
        session_id: &str,
        user_id: UserId,
    ) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO authenticated_user_sessions (session_id, user_id, authenticated_at, last_activity)
            VALUES ($1, $2, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT (session_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                authenticated_at = EXCLUDED.authenticated_at,
                last_activity = CURRENT_TIMESTAMP
            "#,
        )
        .bind(session_id)
        .bind(user_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_authenticated_user(
        &self,
        session_id: &str,
    ) -> Result<Option<AuthenticatedLink>, SessionError> {
        let row = sqlx::query(
            r#"
            SELECT session_id, user_id, authenticated_at
            FROM authenticated_user_sessions
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        row.map(|r| {
            Ok(AuthenticatedLink {
                session_id: r
                    .try_get("session_id")
                    .map_err(|e| SessionError::DatabaseError(e.to_string()))?,
                user_id: UserId(
                    r.try_get("user_id")
                        .map_err(|e| SessionError::DatabaseError(e.to_string()))?,
                ),
                authenticated_at: r
                    .try_get("authenticated_at")
                    .map_err(|e| SessionError::DatabaseError(e.to_string()))?,
            })
        })
        .transpose()
    }

    async fn record_chat(&self, record: ChatRecord) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO guest_chat_history
                (session_id, user_query, bot_response, session_state, intent, is_sensitive, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(&record.session_id)
        .bind(&record.user_query)
        .bind(&record.bot_response)
        .bind(record.session_state.as_str())
        .bind(&record.intent)
        .bind(record.is_sensitive)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn delete_expired(&self, grace_minutes: i64) -> Result<u64, SessionError> {
        let result = sqlx::query(
            r#"
            DELETE FROM guest_sessions
            WHERE expires_at < CURRENT_TIMESTAMP - make_interval(mins => $1::int)
            "#,
        )
        .bind(grace_minutes as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        // Orphaned scratch records go with their sessions.
        sqlx::query(
            r#"
            DELETE FROM guest_auth_temp
            WHERE session_id NOT IN (SELECT session_id FROM guest_sessions)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
