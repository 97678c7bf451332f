use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding input is empty")]
    EmptyInput,

    #[error("embedding request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("embedding request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("embedding service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid embedding response: {reason}")]
    InvalidResponse { reason: String },

    #[error("embedding has {found} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("invalid embedding configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::RequestFailed {
            reason: err.to_string(),
        }
    }
}

/// Result alias for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;
