pub mod auth_temp;
pub mod otp_requests;
pub mod rate_limits;
pub mod sessions;
pub mod tasks;
pub mod users;

pub use auth_temp::PostgresAuthTempRepository;
pub use otp_requests::PostgresOtpRepository;
pub use rate_limits::PostgresRateLimitRepository;
pub use sessions::PostgresSessionStore;
pub use tasks::PostgresTaskRepository;
pub use users::PostgresUserRepository;
