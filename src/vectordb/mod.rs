//! Rubric passage index (Qdrant) with context filtering and hybrid scoring.

pub mod client;
pub mod error;
pub mod lexical;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;


pub use client::{PassageStore, QdrantPassageStore};
pub use error::VectorDbError;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockPassageStore, cosine_similarity};
pub use model::{DEFAULT_CONTENT_TYPE, Passage, PassageHit, PassagePoint, PassageSearchRequest};
