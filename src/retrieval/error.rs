use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::vectordb::VectorDbError;

/// Fatal retrieval failures. Hybrid and rerank failures never surface here; they fall back.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector search failed: {0}")]
    VectorSearch(#[source] VectorDbError),

    #[error("invalid retrieval options: {reason}")]
    InvalidOptions { reason: String },
}

/// Result alias for retrieval operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;
