use thiserror::Error;

/// Errors returned by passage store operations.
#[derive(Debug, Error)]
pub enum VectorDbError {
    /// Could not connect to the Qdrant endpoint.
    #[error("failed to connect to Qdrant at '{url}': {message}")]
    ConnectionFailed { url: String, message: String },

    /// Collection creation failed.
    #[error("failed to create collection '{collection}': {message}")]
    CreateCollectionFailed { collection: String, message: String },

    #[error("collection not found: {collection}")]
    CollectionNotFound { collection: String },

    #[error("failed to upsert passages to '{collection}': {message}")]
    UpsertFailed { collection: String, message: String },

    #[error("failed to search in '{collection}': {message}")]
    SearchFailed { collection: String, message: String },

    /// The hybrid path could not run. Callers fall back to vector search.
    #[error("hybrid search unavailable: {reason}")]
    HybridUnavailable { reason: String },

    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("invalid search request: {reason}")]
    InvalidRequest { reason: String },
}
