//! Query embeddings.
//!
//! - [`HttpEmbedder`] calls the embedding service.
//! - [`EmbeddingCache`] sits in front of any [`Embedder`] so a normalized query is
//!   embedded once.

pub mod cache;
pub mod client;
pub mod config;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod stub;

#[cfg(test)]
mod tests;

pub use cache::{CacheEntry, CachedEmbedding, EmbeddingCache, EmbeddingSource, EmbeddingStore};
#[cfg(any(test, feature = "mock"))]
pub use cache::MemoryEmbeddingStore;
pub use client::{Embedder, HttpEmbedder};
pub use config::EmbeddingConfig;
pub use error::{EmbeddingError, EmbeddingResult};
#[cfg(any(test, feature = "mock"))]
pub use stub::StubEmbedder;
