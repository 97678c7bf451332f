//! Cross-cutting, shared constants.
//!
//! Retrieval defaults are grouped here so the retriever, the config layer and the
//! binary agree on them. Prefer deriving secondary values from primary ones.

/// Embedding dimension requested from the embedding service.
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

pub const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1/embeddings";

/// Number of passages returned to the caller when no count is requested.
pub const DEFAULT_MATCH_COUNT: usize = 8;

/// Candidate pool multiplier applied when a reranker will run.
pub const RERANK_OVERFETCH_FACTOR: usize = 3;

/// Reranking only runs when the pool holds strictly more candidates than this.
pub const RERANK_MIN_CANDIDATES: usize = 3;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.70;

pub const DEFAULT_HYBRID_THRESHOLD: f32 = 0.65;

/// Weight of the vector score in hybrid search (the lexical score gets the rest).
pub const HYBRID_VECTOR_WEIGHT: f32 = 0.70;

pub const DEFAULT_RERANK_URL: &str = "https://api.cohere.ai/v1/rerank";

pub const DEFAULT_RERANK_MODEL: &str = "rerank-multilingual-v3.0";

pub const DEFAULT_REASONING_MODEL: &str = "gpt-4o";

/// Low temperature keeps repeated evaluations of the same artifact consistent.
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

pub const DEFAULT_MAX_TOKENS: u32 = 4000;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_MAX_CONCURRENT_EVALUATIONS: usize = 4;

pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Bounded telemetry queue; records beyond this are dropped, never awaited.
pub const DEFAULT_TELEMETRY_QUEUE: usize = 1024;

/// Pool multiplier for the vector pass of hybrid search, before lexical blending.
pub const HYBRID_OVERFETCH_FACTOR: usize = 3;
