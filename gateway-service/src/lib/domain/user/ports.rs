use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::otp::models::ContactMethod;
use crate::domain::user::errors::UserError;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Persistence for verified user identities.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Look up an existing user by the identity tuple the wizard collects.
    /// Names are matched case-insensitively; the contact method is matched
    /// in its normalized form.
    async fn find_by_identity(
        &self,
        first_name: &str,
        last_name: &str,
        dob: NaiveDate,
        contact: &ContactMethod,
    ) -> Result<Option<User>, UserError>;

    /// Persist a new user. Only called after OTP verification succeeds.
    async fn create(&self, user: NewUser) -> Result<User, UserError>;

    /// Retrieve a user by id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;
}
