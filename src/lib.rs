//! Rubrica library crate (used by the CLI and integration tests).
//!
//! Rubric-grounded retrieval and scoring of professional teaching artifacts.
//!
//! # Public API Surface
//!
//! ## Retrieval
//! - [`EmbeddingCache`], [`HttpEmbedder`] - Query embeddings, computed once per normalized query
//! - [`QdrantPassageStore`] - Context-filtered vector and hybrid passage search
//! - [`HttpReranker`] - Cross-encoder reranking of the over-fetched pool
//! - [`ContextRetriever`], [`format_for_reasoning`] - Orchestration and prompt formatting
//! - [`TelemetryRecorder`] - Non-blocking retrieval metrics
//!
//! ## Rubrics & Evaluation
//! - [`RubricIndicator`], [`Level`], [`Category`] - Validated rubric model
//! - [`EvaluationEngine`], [`GenaiReasoningModel`] - Per-indicator evaluation
//!
//! ## Storage
//! - [`SqliteStore`] - Embedding cache rows, telemetry, rubrics, statistics and results
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod context;
pub mod embedding;
pub mod evaluation;
pub mod hashing;
pub mod reranker;
pub mod retrieval;
pub mod rubric;
pub mod storage;
pub mod telemetry;
pub mod vectordb;

pub use config::{Config, ConfigError};
pub use context::EducationalContext;
#[cfg(any(test, feature = "mock"))]
pub use embedding::{MemoryEmbeddingStore, StubEmbedder};
pub use embedding::{
    CachedEmbedding, Embedder, EmbeddingCache, EmbeddingError, EmbeddingSource, EmbeddingStore,
    HttpEmbedder,
};
#[cfg(any(test, feature = "mock"))]
pub use evaluation::MockReasoningModel;
pub use evaluation::{
    ArtifactEvaluation, EvaluationEngine, EvaluationError, EvaluationRepository, EvaluationResult,
    EvaluationStage, GenaiReasoningModel, ReasoningModel,
};
pub use hashing::{artifact_digest, hash_query};
#[cfg(any(test, feature = "mock"))]
pub use reranker::MockReranker;
pub use reranker::{HttpReranker, RerankHit, Reranker, RerankerError};
pub use retrieval::{
    ContextRetriever, ContextSource, RankedResult, RetrievalError, RetrievalOptions,
    format_for_reasoning, no_context_message,
};
pub use rubric::{
    Category, CategoryTable, IndicatorStatistics, Level, RubricError, RubricIndicator,
    RubricQuery, RubricRepository, StatisticsSource,
};
pub use storage::{SqliteStore, StorageError};
#[cfg(any(test, feature = "mock"))]
pub use telemetry::MemoryTelemetrySink;
pub use telemetry::{TelemetryRecorder, TelemetrySink};
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockPassageStore;
pub use vectordb::{PassageStore, QdrantPassageStore, VectorDbError};
