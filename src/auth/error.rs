use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid API key")]
    InvalidApiKey,
    #[error("missing API key")]
    MissingApiKey,
    #[error("API key has expired")]
    KeyExpired,
    #[error("API key is suspended")]
    KeySuspended,
    #[error("insufficient permissions")]
    InsufficientPermissions,
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    #[error("API key not found")]
    KeyNotFound,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<String> for AuthError {
    fn from(error: String) -> Self {
        AuthError::StorageError(error)
    }
}
