use thiserror::Error;

use crate::domain::otp::errors::OtpError;
use crate::domain::session::errors::SessionError;
use crate::domain::user::errors::UserError;

/// Error for auth-temp scratch record operations
#[derive(Debug, Clone, Error)]
pub enum TempRecordError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Error for follow-on task creation (appointments, tickets)
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Top-level error for the auth step orchestrator.
///
/// `InvalidSession` is the only variant surfaced with instructions to the
/// guest; the rest map to a generic internal error at the HTTP boundary.
#[derive(Debug, Clone, Error)]
pub enum WizardError {
    #[error("Invalid or expired session token")]
    InvalidSession,

    #[error("Session error: {0}")]
    Session(SessionError),

    #[error("Temp record error: {0}")]
    TempRecord(#[from] TempRecordError),

    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    #[error("User error: {0}")]
    User(#[from] UserError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),
}

impl From<SessionError> for WizardError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) | SessionError::Expired(_) => WizardError::InvalidSession,
            other => WizardError::Session(other),
        }
    }
}
