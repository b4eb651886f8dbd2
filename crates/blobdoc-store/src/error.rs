use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(#[from] blobdoc_backend::BackendError),

    #[error("index error: {0}")]
    Index(#[from] blobdoc_index::IndexError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
