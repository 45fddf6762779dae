use thiserror::Error;

/// Error for contact method validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContactMethodError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Invalid phone number: {0}")]
    InvalidPhone(String),
}

/// Error for the delivery adapter
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("Failed to send code: {0}")]
    SendFailed(String),
}

/// Top-level error for OTP operations.
///
/// Generation and verification are critical paths: storage failures here
/// propagate and fail closed, never reporting a false success.
#[derive(Debug, Clone, Error)]
pub enum OtpError {
    #[error("Invalid contact method: {0}")]
    InvalidContact(#[from] ContactMethodError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
