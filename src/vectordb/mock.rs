use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::client::{PassageStore, check_vector_weight};
use super::error::VectorDbError;
use super::lexical;
use super::model::{PassageHit, PassagePoint, PassageSearchRequest};

/// In-memory passage store with the same filter and threshold semantics as Qdrant.
///
/// Points keep insertion order, so equal scores come back in the order they were added.
#[derive(Default)]
pub struct MockPassageStore {
    points: RwLock<Vec<PassagePoint>>,
    fail_search: AtomicBool,
    fail_hybrid: AtomicBool,
    search_calls: AtomicUsize,
    hybrid_calls: AtomicUsize,
    last_limit: AtomicUsize,
}

impl MockPassageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_points(points: Vec<PassagePoint>) -> Self {
        let store = Self::default();
        *store.points.write() = points;
        store
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    pub fn set_fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_hybrid(&self, fail: bool) {
        self.fail_hybrid.store(fail, Ordering::SeqCst);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn hybrid_calls(&self) -> usize {
        self.hybrid_calls.load(Ordering::SeqCst)
    }

    /// `limit` of the most recent search or hybrid request.
    pub fn last_limit(&self) -> usize {
        self.last_limit.load(Ordering::SeqCst)
    }

    fn scan(&self, request: &PassageSearchRequest, limit: usize, threshold: f32) -> Vec<PassageHit> {
        let points = self.points.read();
        let mut hits: Vec<PassageHit> = points
            .iter()
            .filter(|p| p.passage.matches(&request.context))
            .map(|p| PassageHit {
                id: p.id,
                score: cosine_similarity(&request.vector, &p.vector).clamp(0.0, 1.0),
                passage: p.passage.clone(),
            })
            .filter(|hit| hit.score >= threshold)
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        hits
    }
}

impl PassageStore for MockPassageStore {
    async fn search(
        &self,
        request: &PassageSearchRequest,
    ) -> Result<Vec<PassageHit>, VectorDbError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(request.limit, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(VectorDbError::SearchFailed {
                collection: "mock".to_string(),
                message: "mock store set to fail".to_string(),
            });
        }
        Ok(self.scan(request, request.limit, request.score_threshold))
    }

    async fn search_hybrid(
        &self,
        request: &PassageSearchRequest,
        query_text: &str,
        vector_weight: f32,
    ) -> Result<Vec<PassageHit>, VectorDbError> {
        self.hybrid_calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(request.limit, Ordering::SeqCst);
        if self.fail_hybrid.load(Ordering::SeqCst) {
            return Err(VectorDbError::HybridUnavailable {
                reason: "mock store set to fail hybrid".to_string(),
            });
        }
        check_vector_weight(vector_weight)?;

        let floor = lexical::min_vector_score(request.score_threshold, vector_weight);
        let hits = self.scan(request, usize::MAX, floor);
        Ok(lexical::blend(
            hits,
            query_text,
            vector_weight,
            request.score_threshold,
            request.limit,
        ))
    }

    async fn upsert_passages(&self, points: Vec<PassagePoint>) -> Result<(), VectorDbError> {
        let mut stored = self.points.write();
        for point in points {
            match stored.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => stored.push(point),
            }
        }
        Ok(())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
