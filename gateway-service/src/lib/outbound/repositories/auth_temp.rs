use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::otp::models::OtpChannel;
use crate::domain::session::models::SessionStatus;
use crate::domain::user::models::UserId;
use crate::domain::wizard::errors::TempRecordError;
use crate::domain::wizard::models::AuthTempRecord;
use crate::domain::wizard::models::Intent;
use crate::domain::wizard::ports::AuthTempRepository;

/// Minutes a scratch record survives without progress.
const RECORD_TTL_MINUTES: i32 = 30;

pub struct PostgresAuthTempRepository {
    pool: PgPool,
}

impl PostgresAuthTempRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn db_err(e: impl ToString) -> TempRecordError {
        TempRecordError::DatabaseError(e.to_string())
    }

    fn row_to_record(row: &PgRow) -> Result<AuthTempRecord, TempRecordError> {
        let channel: Option<String> = row
            .try_get("preferred_otp_channel")
            .map_err(Self::db_err)?;
        let intent: Option<String> = row.try_get("original_intent").map_err(Self::db_err)?;
        let paused: Option<String> = row.try_get("auth_paused_state").map_err(Self::db_err)?;
        let user_id: Option<uuid::Uuid> = row.try_get("user_id").map_err(Self::db_err)?;

        Ok(AuthTempRecord {
            session_id: row.try_get("session_id").map_err(Self::db_err)?,
            first_name: row.try_get("first_name").map_err(Self::db_err)?,
            last_name: row.try_get("last_name").map_err(Self::db_err)?,
            dob: row.try_get("dob").map_err(Self::db_err)?,
            email: row.try_get("email").map_err(Self::db_err)?,
            phone: row.try_get("phone").map_err(Self::db_err)?,
            preferred_otp_channel: channel.and_then(|c| c.parse::<OtpChannel>().ok()),
            user_id: user_id.map(UserId),
            original_intent: intent.and_then(|i| i.parse::<Intent>().ok()),
            original_query: row.try_get("original_query").map_err(Self::db_err)?,
            auth_paused_state: paused.and_then(|p| p.parse::<SessionStatus>().ok()),
            expires_at: row.try_get("expires_at").map_err(Self::db_err)?,
        })
    }
}

#[async_trait]
impl AuthTempRepository for PostgresAuthTempRepository {
    async fn stash_intent(
        &self,
        session_id: &str,
        intent: Intent,
        query: &str,
    ) -> Result<(), TempRecordError> {
        sqlx::query(
            r#"
            INSERT INTO guest_auth_temp (session_id, original_intent, original_query, expires_at)
            VALUES ($1, $2, $3, CURRENT_TIMESTAMP + make_interval(mins => $4))
            ON CONFLICT (session_id) DO UPDATE SET
                original_intent = EXCLUDED.original_intent,
                original_query = EXCLUDED.original_query,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session_id)
        .bind(intent.as_str())
        .bind(query)
        .bind(RECORD_TTL_MINUTES)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn save_names(
        &self,
        session_id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), TempRecordError> {
        sqlx::query(
            r#"
            INSERT INTO guest_auth_temp (session_id, first_name, last_name, expires_at)
            VALUES ($1, $2, $3, CURRENT_TIMESTAMP + make_interval(mins => $4))
            ON CONFLICT (session_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session_id)
        .bind(first_name)
        .bind(last_name)
        .bind(RECORD_TTL_MINUTES)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn save_dob_contact(
        &self,
        session_id: &str,
        dob: NaiveDate,
        email: Option<&str>,
        phone: Option<&str>,
        channel: OtpChannel,
    ) -> Result<(), TempRecordError> {
        sqlx::query(
            r#"
            UPDATE guest_auth_temp
            SET dob = $2,
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                preferred_otp_channel = $5,
                expires_at = CURRENT_TIMESTAMP + make_interval(mins => $6)
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(dob)
        .bind(email)
        .bind(phone)
        .bind(channel.as_str())
        .bind(RECORD_TTL_MINUTES)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn save_user_link(
        &self,
        session_id: &str,
        user_id: Option<UserId>,
    ) -> Result<(), TempRecordError> {
        sqlx::query(
            r#"
            UPDATE guest_auth_temp
            SET user_id = $2
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .bind(user_id.map(|id| id.0))
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn set_paused_state(
        &self,
        session_id: &str,
        state: Option<SessionStatus>,
    ) -> Result<(), TempRecordError> {
        sqlx::query(
            r#"
            INSERT INTO guest_auth_temp (session_id, auth_paused_state, expires_at)
            VALUES ($1, $2, CURRENT_TIMESTAMP + make_interval(mins => $3))
            ON CONFLICT (session_id) DO UPDATE SET
                auth_paused_state = EXCLUDED.auth_paused_state,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(session_id)
        .bind(state.map(|s| s.as_str()))
        .bind(RECORD_TTL_MINUTES)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn find(&self, session_id: &str) -> Result<Option<AuthTempRecord>, TempRecordError> {
        let row = sqlx::query(
            r#"
            SELECT session_id, first_name, last_name, dob, email, phone,
                   preferred_otp_channel, user_id, original_intent, original_query,
                   auth_paused_state, expires_at
            FROM guest_auth_temp
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn delete(&self, session_id: &str) -> Result<(), TempRecordError> {
        sqlx::query("DELETE FROM guest_auth_temp WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(Self::db_err)?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, TempRecordError> {
        let result = sqlx::query(
            "DELETE FROM guest_auth_temp WHERE expires_at < CURRENT_TIMESTAMP",
        )
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(result.rows_affected())
    }
}
