use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::otp::models::ContactMethod;
use crate::domain::user::errors::UserError;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn db_err(e: impl ToString) -> UserError {
        UserError::DatabaseError(e.to_string())
    }

    fn row_to_user(row: &PgRow) -> Result<User, UserError> {
        Ok(User {
            id: UserId(row.try_get("user_id").map_err(Self::db_err)?),
            first_name: row.try_get("first_name").map_err(Self::db_err)?,
            last_name: row.try_get("last_name").map_err(Self::db_err)?,
            dob: row.try_get("dob").map_err(Self::db_err)?,
            email: row.try_get("email").map_err(Self::db_err)?,
            phone: row.try_get("phone").map_err(Self::db_err)?,
            created_at: row.try_get("created_at").map_err(Self::db_err)?,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_identity(
        &self,
        first_name: &str,
        last_name: &str,
        dob: NaiveDate,
        contact: &ContactMethod,
    ) -> Result<Option<User>, UserError> {
        // Phone is the primary identifier; email lookups are the fallback.
        let query = match contact {
            ContactMethod::Phone(_) => {
                r#"
                SELECT user_id, first_name, last_name, dob, email, phone, created_at
                FROM users
                WHERE LOWER(first_name) = LOWER($1)
                  AND LOWER(last_name) = LOWER($2)
                  AND dob = $3
                  AND phone = $4
                "#
            }
            ContactMethod::Email(_) => {
                r#"
                SELECT user_id, first_name, last_name, dob, email, phone, created_at
                FROM users
                WHERE LOWER(first_name) = LOWER($1)
                  AND LOWER(last_name) = LOWER($2)
                  AND dob = $3
                  AND LOWER(email) = LOWER($4)
                "#
            }
        };

        let row = sqlx::query(query)
            .bind(first_name)
            .bind(last_name)
            .bind(dob)
            .bind(contact.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err)?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (user_id, first_name, last_name, dob, email, phone, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, CURRENT_TIMESTAMP)
            RETURNING user_id, first_name, last_name, dob, email, phone, created_at
            "#,
        )
        .bind(UserId::new().0)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.dob)
        .bind(&user.email)
        .bind(&user.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Self::row_to_user(&row)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, first_name, last_name, dob, email, phone, created_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.as_ref().map(Self::row_to_user).transpose()
    }
}
