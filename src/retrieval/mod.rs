//! Context retrieval for evaluation prompts.
//!
//! [`ContextRetriever`] combines the embedding cache, the passage index, an optional
//! reranker and telemetry. Results are rendered for prompts by [`format_for_reasoning`].

pub mod config;
mod error;
pub mod format;
pub mod retriever;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::RetrieverConfig;
pub use error::{RetrievalError, RetrievalResult};
pub use format::{format_for_reasoning, no_context_message};
pub use retriever::{ContextRetriever, ContextSource};
pub use types::{PassageMetadata, RankedResult, RetrievalCandidate, RetrievalOptions};
