use thiserror::Error;

/// Error for rate-limit bookkeeping operations
#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
