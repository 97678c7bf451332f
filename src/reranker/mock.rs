use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{RerankHit, Reranker, RerankerError, check_indices};
use crate::vectordb::lexical;

/// Scores documents by lexical relevance unless fixed scores are set.
#[derive(Debug, Default)]
pub struct MockReranker {
    fixed_scores: Mutex<Option<Vec<f32>>>,
    fail: AtomicBool,
    calls: AtomicUsize,
    last_pool: AtomicUsize,
}

impl MockReranker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `scores[i]` as the relevance of document `i`.
    pub fn with_scores(scores: Vec<f32>) -> Self {
        let reranker = Self::default();
        *reranker.fixed_scores.lock() = Some(scores);
        reranker
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of documents in the most recent call.
    pub fn last_pool(&self) -> usize {
        self.last_pool.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reranker for MockReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, RerankerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_pool.store(documents.len(), Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(RerankerError::Status {
                status: 503,
                body: "mock reranker set to fail".to_string(),
            });
        }

        let mut hits: Vec<RerankHit> = match self.fixed_scores.lock().as_ref() {
            Some(scores) => scores
                .iter()
                .enumerate()
                .map(|(index, &relevance)| RerankHit { index, relevance })
                .collect(),
            None => lexical::pool_relevance(query, documents)
                .into_iter()
                .enumerate()
                .map(|(index, relevance)| RerankHit { index, relevance })
                .collect(),
        };
        check_indices(&hits, documents.len())?;

        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_n);
        Ok(hits)
    }
}
