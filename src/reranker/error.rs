use thiserror::Error;

/// A failed rerank attempt. Callers fall back to the un-reranked order; there is no retry.
#[derive(Debug, Error)]
pub enum RerankerError {
    #[error("rerank request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("rerank request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("rerank service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid rerank response: {reason}")]
    InvalidResponse { reason: String },

    /// The service referenced a document that was not sent.
    #[error("rerank result index {index} out of range for {len} documents")]
    InvalidIndex { index: usize, len: usize },

    #[error("invalid reranker configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<reqwest::Error> for RerankerError {
    fn from(err: reqwest::Error) -> Self {
        RerankerError::RequestFailed {
            reason: err.to_string(),
        }
    }
}
