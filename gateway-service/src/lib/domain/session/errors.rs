use thiserror::Error;

/// Error for session status parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionStatusError {
    #[error("Unknown session status: {0}")]
    Unknown(String),
}

/// Top-level error for session store operations
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session expired: {0}")]
    Expired(String),

    #[error("Invalid session status: {0}")]
    InvalidStatus(#[from] SessionStatusError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
