use crate::config::ConfigError;
use crate::constants::{
    DEFAULT_HYBRID_THRESHOLD, DEFAULT_MATCH_COUNT, DEFAULT_SIMILARITY_THRESHOLD,
    HYBRID_VECTOR_WEIGHT, RERANK_MIN_CANDIDATES, RERANK_OVERFETCH_FACTOR,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    pub default_match_count: usize,
    pub vector_threshold: f32,
    pub hybrid_threshold: f32,
    /// Weight of the vector score in hybrid mode.
    pub hybrid_vector_weight: f32,
    /// Pool multiplier when a reranker is configured.
    pub overfetch_factor: usize,
    /// Reranking runs only for pools strictly larger than this.
    pub rerank_min_candidates: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            default_match_count: DEFAULT_MATCH_COUNT,
            vector_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            hybrid_threshold: DEFAULT_HYBRID_THRESHOLD,
            hybrid_vector_weight: HYBRID_VECTOR_WEIGHT,
            overfetch_factor: RERANK_OVERFETCH_FACTOR,
            rerank_min_candidates: RERANK_MIN_CANDIDATES,
        }
    }
}

impl RetrieverConfig {
    pub fn with_vector_threshold(mut self, threshold: f32) -> Self {
        self.vector_threshold = threshold;
        self
    }

    pub fn with_hybrid_threshold(mut self, threshold: f32) -> Self {
        self.hybrid_threshold = threshold;
        self
    }

    pub fn with_hybrid_vector_weight(mut self, weight: f32) -> Self {
        self.hybrid_vector_weight = weight;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.vector_threshold) || !unit.contains(&self.hybrid_threshold) {
            return Err(ConfigError::OutOfRange {
                name: "similarity threshold",
                reason: "thresholds must lie within 0.0 and 1.0".to_string(),
            });
        }
        if !unit.contains(&self.hybrid_vector_weight) {
            return Err(ConfigError::OutOfRange {
                name: "hybrid vector weight",
                reason: "weight must lie within 0.0 and 1.0".to_string(),
            });
        }
        if self.default_match_count == 0 || self.overfetch_factor == 0 {
            return Err(ConfigError::OutOfRange {
                name: "match count",
                reason: "match count and over-fetch factor must be positive".to_string(),
            });
        }
        Ok(())
    }
}
