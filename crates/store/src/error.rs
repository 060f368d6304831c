use thiserror::Error;

/// Errors raised by storage engines and file accessors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),

    #[error("Storage is sealed")]
    Sealed,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
