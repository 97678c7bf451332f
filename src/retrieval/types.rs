use serde::{Deserialize, Serialize};

use crate::vectordb::PassageHit;

/// Source metadata carried with a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub passage_id: String,
    pub content_type: String,
    pub domain: Option<String>,
    pub standard_number: Option<u32>,
    pub subject: String,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub content: String,
    /// Vector (or blended hybrid) similarity in `[0, 1]`.
    pub similarity: f32,
    pub rerank_score: Option<f32>,
    pub metadata: PassageMetadata,
}

impl From<PassageHit> for RetrievalCandidate {
    fn from(hit: PassageHit) -> Self {
        let passage = hit.passage;
        Self {
            content: passage.content,
            similarity: hit.score,
            rerank_score: None,
            metadata: PassageMetadata {
                passage_id: passage.passage_id,
                content_type: passage.content_type,
                domain: passage.domain,
                standard_number: passage.standard_number,
                subject: passage.subject,
                level: passage.level,
            },
        }
    }
}

/// A candidate plus the single score used for ordering: the rerank relevance when
/// reranking succeeded, otherwise the similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub candidate: RetrievalCandidate,
    pub score_final: f32,
}

impl RankedResult {
    pub(crate) fn from_similarity(candidate: RetrievalCandidate) -> Self {
        let score_final = candidate.similarity;
        Self {
            candidate,
            score_final,
        }
    }

    pub(crate) fn from_rerank(mut candidate: RetrievalCandidate, relevance: f32) -> Self {
        candidate.rerank_score = Some(relevance);
        Self {
            candidate,
            score_final: relevance,
        }
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.candidate.content
    }

    #[inline]
    pub fn metadata(&self) -> &PassageMetadata {
        &self.candidate.metadata
    }
}

/// Per-call retrieval options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOptions {
    pub requested_count: usize,
    /// `None` uses the configured vector or hybrid threshold.
    pub similarity_threshold: Option<f32>,
    pub hybrid_enabled: bool,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            requested_count: crate::constants::DEFAULT_MATCH_COUNT,
            similarity_threshold: None,
            hybrid_enabled: false,
        }
    }
}

impl RetrievalOptions {
    pub fn with_count(mut self, requested_count: usize) -> Self {
        self.requested_count = requested_count;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    pub fn with_hybrid(mut self, enabled: bool) -> Self {
        self.hybrid_enabled = enabled;
        self
    }
}
