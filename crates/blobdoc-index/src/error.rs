//! Error types for the index crate.

use blobdoc_backend::BackendError;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A collection, field or document id cannot be used in a key.
    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// The stored catalog entry for a collection could not be decoded.
    #[error("corrupt index catalog for collection {collection}: {reason}")]
    CorruptCatalog { collection: String, reason: String },

    /// A stored backfill status record could not be decoded.
    #[error("corrupt backfill status at {key}: {reason}")]
    CorruptStatus { key: String, reason: String },

    /// A catalog entry or status record could not be encoded for writing.
    #[error("failed to encode {what}: {reason}")]
    Serialization { what: String, reason: String },

    /// Configuration values are out of range.
    #[error("invalid index configuration: {0}")]
    InvalidConfig(String),

    /// A worker pool was closed while work was waiting for it.
    #[error("worker pool closed")]
    PoolClosed,

    /// A spawned task panicked or was cancelled.
    #[error("index task failed: {0}")]
    TaskFailed(String),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
