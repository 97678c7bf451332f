use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("sqlite error: {0}")]
    Sqlite(String),

    #[error("failed to encode or decode stored value: {0}")]
    Serialization(String),

    /// A stored row violates an invariant (e.g. a rubric that no longer validates).
    #[error("invalid stored data: {reason}")]
    InvalidData { reason: String },

    #[error("storage task failed: {0}")]
    TaskFailed(String),

    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Sqlite(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::TaskFailed(err.to_string())
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
