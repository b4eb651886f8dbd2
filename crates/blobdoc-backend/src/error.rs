/// Errors from blob backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend service rejected or failed the request.
    #[error("backend request for {key} failed: {reason}")]
    Service { key: String, reason: String },

    /// The key cannot be represented by this backend.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// A list cursor was not produced by this backend.
    #[error("invalid list cursor: {0}")]
    InvalidCursor(String),

    /// Serialization or deserialization of backend metadata failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
