use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::user::models::UserId;
use crate::domain::wizard::errors::TaskError;
use crate::domain::wizard::models::TicketPriority;
use crate::domain::wizard::ports::TaskRepository;

pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn db_err(e: impl ToString) -> TaskError {
        TaskError::DatabaseError(e.to_string())
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn create_appointment(
        &self,
        user_id: UserId,
        booking_id: &str,
        appointment_type: &str,
        details: &str,
    ) -> Result<(), TaskError> {
        sqlx::query(
            r#"
            INSERT INTO appointments
                (booking_id, user_id, appointment_type, request_details, status, created_at)
            VALUES ($1, $2, $3, $4, 'pending', CURRENT_TIMESTAMP)
            "#,
        )
        .bind(booking_id)
        .bind(user_id.0)
        .bind(appointment_type)
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn create_ticket(
        &self,
        user_id: UserId,
        ticket_id: &str,
        ticket_type: &str,
        priority: TicketPriority,
        description: &str,
    ) -> Result<(), TaskError> {
        sqlx::query(
            r#"
            INSERT INTO support_tickets
                (ticket_id, user_id, ticket_type, description, priority, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 'open', CURRENT_TIMESTAMP)
            "#,
        )
        .bind(ticket_id)
        .bind(user_id.0)
        .bind(ticket_type)
        .bind(description)
        .bind(priority.as_str())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }
}
