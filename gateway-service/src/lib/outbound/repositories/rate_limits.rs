use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::rate_limit::errors::RateLimitError;
use crate::domain::rate_limit::models::IdentifierKind;
use crate::domain::rate_limit::models::WindowSample;
use crate::domain::rate_limit::ports::RateLimitRepository;

/// Counter-row rate-limit store: one row per `(identifier, identifier_type)`
/// holding the request count for the current window. Recording is a single
/// upsert so concurrent requests from the same identifier cannot lose
/// updates.
pub struct PostgresRateLimitRepository {
    pool: PgPool,
}

impl PostgresRateLimitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn db_err(e: impl ToString) -> RateLimitError {
        RateLimitError::DatabaseError(e.to_string())
    }
}

#[async_trait]
impl RateLimitRepository for PostgresRateLimitRepository {
    async fn sample(
        &self,
        identifier: &str,
        kind: IdentifierKind,
        window_minutes: i64,
    ) -> Result<WindowSample, RateLimitError> {
        let row = sqlx::query(
            r#"
            SELECT request_count, window_started_at, blocked_until
            FROM otp_rate_limits
            WHERE identifier = $1 AND identifier_type = $2
            "#,
        )
        .bind(identifier)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        let Some(row) = row else {
            return Ok(WindowSample::empty());
        };

        let request_count: i32 = row.try_get("request_count").map_err(Self::db_err)?;
        let window_started_at: DateTime<Utc> =
            row.try_get("window_started_at").map_err(Self::db_err)?;
        let blocked_until: Option<DateTime<Utc>> =
            row.try_get("blocked_until").map_err(Self::db_err)?;

        // A rolled-over window counts as empty; the row is refreshed by the
        // next record().
        let window_end =
            window_started_at + chrono::Duration::minutes(window_minutes);
        if window_end < Utc::now() && blocked_until.map_or(true, |until| until < Utc::now()) {
            return Ok(WindowSample::empty());
        }

        Ok(WindowSample {
            request_count: request_count.max(0) as u32,
            window_started_at: Some(window_started_at),
            blocked_until,
        })
    }

    async fn record(
        &self,
        identifier: &str,
        kind: IdentifierKind,
        window_minutes: i64,
    ) -> Result<u32, RateLimitError> {
        // Atomic check-and-increment: rolls the window over or increments
        // in one statement, returning the in-window count.
        let row = sqlx::query(
            r#"
            INSERT INTO otp_rate_limits
                (identifier, identifier_type, request_count, window_started_at, last_request)
            VALUES ($1, $2, 1, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT (identifier, identifier_type) DO UPDATE SET
                request_count = CASE
                    WHEN otp_rate_limits.window_started_at
                         < CURRENT_TIMESTAMP - make_interval(mins => $3)
                    THEN 1
                    ELSE otp_rate_limits.request_count + 1
                END,
                window_started_at = CASE
                    WHEN otp_rate_limits.window_started_at
                         < CURRENT_TIMESTAMP - make_interval(mins => $3)
                    THEN CURRENT_TIMESTAMP
                    ELSE otp_rate_limits.window_started_at
                END,
                blocked_until = CASE
                    WHEN otp_rate_limits.window_started_at
                         < CURRENT_TIMESTAMP - make_interval(mins => $3)
                    THEN NULL
                    ELSE otp_rate_limits.blocked_until
                END,
                last_request = CURRENT_TIMESTAMP
            RETURNING request_count
            "#,
        )
        .bind(identifier)
        .bind(kind.as_str())
        .bind(window_minutes as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_err)?;

        let count: i32 = row.try_get("request_count").map_err(Self::db_err)?;
        Ok(count.max(0) as u32)
    }

    async fn set_block(
        &self,
        identifier: &str,
        kind: IdentifierKind,
        blocked_until: DateTime<Utc>,
    ) -> Result<(), RateLimitError> {
        sqlx::query(
            r#"
            UPDATE otp_rate_limits
            SET blocked_until = $3
            WHERE identifier = $1 AND identifier_type = $2
            "#,
        )
        .bind(identifier)
        .bind(kind.as_str())
        .bind(blocked_until)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn clear(&self, identifier: &str, kind: IdentifierKind) -> Result<(), RateLimitError> {
        sqlx::query(
            "DELETE FROM otp_rate_limits WHERE identifier = $1 AND identifier_type = $2",
        )
        .bind(identifier)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, RateLimitError> {
        let result = sqlx::query(
            r#"
            DELETE FROM otp_rate_limits
            WHERE last_request < $1
              AND (blocked_until IS NULL OR blocked_until < CURRENT_TIMESTAMP)
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(result.rows_affected())
    }
}
