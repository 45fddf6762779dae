use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::otp::errors::OtpError;
use crate::domain::otp::models::OtpRequest;
use crate::domain::otp::models::OtpStats;
use crate::domain::otp::models::OtpStatus;
use crate::domain::otp::ports::OtpRepository;

pub struct PostgresOtpRepository {
    pool: PgPool,
}

impl PostgresOtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn db_err(e: impl ToString) -> OtpError {
        OtpError::DatabaseError(e.to_string())
    }

    fn row_to_request(row: &PgRow) -> Result<OtpRequest, OtpError> {
        let channel: String = row.try_get("channel").map_err(Self::db_err)?;
        let status: String = row.try_get("status").map_err(Self::db_err)?;

        Ok(OtpRequest {
            otp_id: row.try_get("otp_id").map_err(Self::db_err)?,
            session_id: row.try_get("session_id").map_err(Self::db_err)?,
            identifier: row.try_get("identifier").map_err(Self::db_err)?,
            channel: channel.parse().map_err(OtpError::DatabaseError)?,
            otp_hash: row.try_get("otp_hash").map_err(Self::db_err)?,
            salt: row.try_get("salt").map_err(Self::db_err)?,
            expires_at: row.try_get("expires_at").map_err(Self::db_err)?,
            attempts_left: row.try_get("attempts_left").map_err(Self::db_err)?,
            status: status.parse().map_err(OtpError::DatabaseError)?,
            created_at: row.try_get("created_at").map_err(Self::db_err)?,
            verified_at: row.try_get("verified_at").map_err(Self::db_err)?,
        })
    }
}

const REQUEST_COLUMNS: &str = "otp_id, session_id, identifier, channel, otp_hash, salt, \
     expires_at, attempts_left, status, created_at, verified_at";

#[async_trait]
impl OtpRepository for PostgresOtpRepository {
    async fn create_replacing_pending(&self, request: OtpRequest) -> Result<(), OtpError> {
        // One transaction: the old pending code dies in the same moment the
        // new one is born, so concurrent readers never see two live codes.
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;

        sqlx::query(
            r#"
            UPDATE otp_requests
            SET status = 'expired'
            WHERE session_id = $1 AND status = 'pending'
            "#,
        )
        .bind(&request.session_id)
        .execute(&mut *tx)
        .await
        .map_err(Self::db_err)?;

        sqlx::query(
            r#"
            INSERT INTO otp_requests
                (otp_id, session_id, identifier, channel, otp_hash, salt,
                 expires_at, attempts_left, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&request.otp_id)
        .bind(&request.session_id)
        .bind(&request.identifier)
        .bind(request.channel.as_str())
        .bind(&request.otp_hash)
        .bind(&request.salt)
        .bind(request.expires_at)
        .bind(request.attempts_left)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .execute(&mut *tx)
        .await
        .map_err(Self::db_err)?;

        tx.commit().await.map_err(Self::db_err)
    }

    async fn find_pending(&self, otp_id: &str) -> Result<Option<OtpRequest>, OtpError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM otp_requests WHERE otp_id = $1 AND status = 'pending'"
        ))
        .bind(otp_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.as_ref().map(Self::row_to_request).transpose()
    }

    async fn find_pending_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<OtpRequest>, OtpError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM otp_requests \
             WHERE session_id = $1 AND status = 'pending' \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.as_ref().map(Self::row_to_request).transpose()
    }

    async fn set_status(&self, otp_id: &str, status: OtpStatus) -> Result<(), OtpError> {
        sqlx::query("UPDATE otp_requests SET status = $2 WHERE otp_id = $1")
            .bind(otp_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(Self::db_err)?;

        Ok(())
    }

    async fn mark_verified(&self, otp_id: &str) -> Result<(), OtpError> {
        sqlx::query(
            r#"
            UPDATE otp_requests
            SET status = 'verified', verified_at = CURRENT_TIMESTAMP
            WHERE otp_id = $1
            "#,
        )
        .bind(otp_id)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn decrement_attempts(&self, otp_id: &str) -> Result<i32, OtpError> {
        let row = sqlx::query(
            r#"
            UPDATE otp_requests
            SET attempts_left = attempts_left - 1
            WHERE otp_id = $1
            RETURNING attempts_left
            "#,
        )
        .bind(otp_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.try_get("attempts_left").map_err(Self::db_err)
    }

    async fn expire_pending_for_session(&self, session_id: &str) -> Result<u64, OtpError> {
        let result = sqlx::query(
            r#"
            UPDATE otp_requests
            SET status = 'expired'
            WHERE session_id = $1 AND status = 'pending'
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(result.rows_affected())
    }

    async fn latest_verified_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<OtpRequest>, OtpError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM otp_requests \
             WHERE session_id = $1 AND status = 'verified' \
             ORDER BY verified_at DESC LIMIT 1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.as_ref().map(Self::row_to_request).transpose()
    }

    async fn stats_for_identifier(
        &self,
        identifier: &str,
        since: DateTime<Utc>,
    ) -> Result<OtpStats, OtpError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_requests,
                COUNT(*) FILTER (WHERE status = 'verified') AS verified_count,
                COUNT(*) FILTER (WHERE status = 'expired') AS expired_count,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_count
            FROM otp_requests
            WHERE identifier = $1 AND created_at > $2
            "#,
        )
        .bind(identifier)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(OtpStats {
            total_requests: row.try_get("total_requests").map_err(Self::db_err)?,
            verified_count: row.try_get("verified_count").map_err(Self::db_err)?,
            expired_count: row.try_get("expired_count").map_err(Self::db_err)?,
            pending_count: row.try_get("pending_count").map_err(Self::db_err)?,
        })
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, OtpError> {
        let result = sqlx::query("DELETE FROM otp_requests WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(Self::db_err)?;

        Ok(result.rows_affected())
    }
}
