use thiserror::Error;

/// Error type for passcode handling.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OtpCodeError {
    #[error("Passcode must be 6 digits")]
    InvalidFormat,
}
