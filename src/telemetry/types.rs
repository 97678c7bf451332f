use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::EducationalContext;

/// One retrieval call, successful or empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub query: String,
    pub context: EducationalContext,
    /// Pool size before reranking and truncation.
    pub candidates_count: usize,
    pub results_count: usize,
    /// Mean `score_final` of the returned results; 0 when empty.
    pub mean_score: f32,
    pub latency_ms: u64,
    pub reranking_applied: bool,
    pub hybrid_applied: bool,
    pub recorded_at: DateTime<Utc>,
}

/// A query that matched nothing, kept to find gaps in rubric coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryWithoutResults {
    pub query: String,
    pub context: EducationalContext,
    pub similarity_threshold: f32,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryRecord {
    Retrieval(RetrievalMetrics),
    EmptyResult(QueryWithoutResults),
}
