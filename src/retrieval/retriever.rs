use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::config::RetrieverConfig;
use super::error::{RetrievalError, RetrievalResult};
use super::format::{format_for_reasoning, no_context_message};
use super::types::{RankedResult, RetrievalCandidate, RetrievalOptions};
use crate::context::EducationalContext;
use crate::embedding::EmbeddingCache;
use crate::reranker::Reranker;
use crate::telemetry::{QueryWithoutResults, RetrievalMetrics, TelemetryRecord, TelemetryRecorder};
use crate::vectordb::{PassageHit, PassageSearchRequest, PassageStore};

/// Turns a query plus educational context into ranked rubric passages.
///
/// Flow: embedding cache, then filtered vector (or hybrid) search over a pool of
/// `requested_count × overfetch_factor` when a reranker is configured, then
/// reranking when the pool is large enough, then truncation and telemetry.
pub struct ContextRetriever<S: PassageStore> {
    cache: Arc<EmbeddingCache>,
    store: Arc<S>,
    reranker: Option<Arc<dyn Reranker>>,
    telemetry: TelemetryRecorder,
    config: RetrieverConfig,
}

impl<S: PassageStore> std::fmt::Debug for ContextRetriever<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRetriever")
            .field("cache", &self.cache)
            .field("reranker", &self.reranker.is_some())
            .field("telemetry", &self.telemetry)
            .field("config", &self.config)
            .finish()
    }
}

impl<S: PassageStore> ContextRetriever<S> {
    pub fn new(cache: Arc<EmbeddingCache>, store: Arc<S>, config: RetrieverConfig) -> Self {
        Self {
            cache,
            store,
            reranker: None,
            telemetry: TelemetryRecorder::disabled(),
            config,
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryRecorder) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Options with this retriever's default match count.
    pub fn default_options(&self) -> RetrievalOptions {
        RetrievalOptions::default().with_count(self.config.default_match_count)
    }

    /// Pool size fetched from the store for `requested_count` results.
    pub fn pool_size(&self, requested_count: usize) -> usize {
        if self.reranker.is_some() {
            requested_count.saturating_mul(self.config.overfetch_factor)
        } else {
            requested_count
        }
    }

    /// Ranked passages for `query` within `context`. An empty list is a valid outcome.
    #[instrument(skip(self, query, context), fields(query_len = query.len(), count = options.requested_count, hybrid = options.hybrid_enabled))]
    pub async fn retrieve_context(
        &self,
        query: &str,
        context: &EducationalContext,
        options: RetrievalOptions,
    ) -> RetrievalResult<Vec<RankedResult>> {
        let started = Instant::now();

        if options.requested_count == 0 {
            return Err(RetrievalError::InvalidOptions {
                reason: "requested_count must be positive".to_string(),
            });
        }
        let threshold = options.similarity_threshold.unwrap_or(if options.hybrid_enabled {
            self.config.hybrid_threshold
        } else {
            self.config.vector_threshold
        });
        if !(0.0..=1.0).contains(&threshold) {
            return Err(RetrievalError::InvalidOptions {
                reason: format!("similarity threshold {threshold} outside [0, 1]"),
            });
        }

        let embedding = self.cache.get_or_create(query).await?;
        debug!(source = ?embedding.source, query_hash = %embedding.query_hash, "Query embedding resolved");

        let pool = self.pool_size(options.requested_count);
        let request =
            PassageSearchRequest::new(embedding.vector.as_ref().clone(), context.clone(), pool)
                .with_threshold(threshold);

        let (hits, hybrid_applied) = self.search(&request, query, options.hybrid_enabled).await?;
        let candidates: Vec<RetrievalCandidate> = hits.into_iter().map(Into::into).collect();
        let candidates_count = candidates.len();

        let (results, reranking_applied) = self
            .rank(query, candidates, options.requested_count)
            .await;

        let latency_ms = started.elapsed().as_millis() as u64;
        let mean_score = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.score_final).sum::<f32>() / results.len() as f32
        };

        self.telemetry
            .record(TelemetryRecord::Retrieval(RetrievalMetrics {
                query: query.to_string(),
                context: context.clone(),
                candidates_count,
                results_count: results.len(),
                mean_score,
                latency_ms,
                reranking_applied,
                hybrid_applied,
                recorded_at: Utc::now(),
            }));

        if candidates_count == 0 {
            info!(%context, threshold, "No passages matched query");
            self.telemetry
                .record(TelemetryRecord::EmptyResult(QueryWithoutResults {
                    query: query.to_string(),
                    context: context.clone(),
                    similarity_threshold: threshold,
                    recorded_at: Utc::now(),
                }));
        } else {
            info!(
                candidates = candidates_count,
                results = results.len(),
                reranking_applied,
                hybrid_applied,
                latency_ms,
                "Context retrieved"
            );
        }

        Ok(results)
    }

    /// [`retrieve_context`](Self::retrieve_context) rendered with [`format_for_reasoning`],
    /// or a fixed sentence when nothing matched.
    pub async fn retrieve_formatted(
        &self,
        query: &str,
        context: &EducationalContext,
        options: RetrievalOptions,
    ) -> RetrievalResult<String> {
        let results = self.retrieve_context(query, context, options).await?;
        if results.is_empty() {
            return Ok(no_context_message(context.year));
        }
        Ok(format_for_reasoning(&results, context))
    }

    async fn search(
        &self,
        request: &PassageSearchRequest,
        query: &str,
        hybrid: bool,
    ) -> RetrievalResult<(Vec<PassageHit>, bool)> {
        if hybrid {
            match self
                .store
                .search_hybrid(request, query, self.config.hybrid_vector_weight)
                .await
            {
                Ok(hits) => return Ok((hits, true)),
                Err(e) => {
                    warn!(error = %e, "Hybrid search failed; falling back to vector search");
                }
            }
        }

        let hits = self
            .store
            .search(request)
            .await
            .map_err(RetrievalError::VectorSearch)?;
        Ok((hits, false))
    }

    /// Reranks when possible; on any rerank failure keeps the store's order.
    async fn rank(
        &self,
        query: &str,
        candidates: Vec<RetrievalCandidate>,
        requested_count: usize,
    ) -> (Vec<RankedResult>, bool) {
        let Some(reranker) = &self.reranker else {
            return (by_similarity(candidates, requested_count), false);
        };
        if candidates.len() <= self.config.rerank_min_candidates {
            debug!(pool = candidates.len(), "Pool too small to rerank");
            return (by_similarity(candidates, requested_count), false);
        }

        let documents: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        match reranker.rerank(query, &documents, requested_count).await {
            Ok(hits) if !hits.is_empty() => {
                let mut slots: Vec<Option<RetrievalCandidate>> =
                    candidates.into_iter().map(Some).collect();
                let results: Vec<RankedResult> = hits
                    .into_iter()
                    .filter_map(|hit| {
                        slots
                            .get_mut(hit.index)
                            .and_then(Option::take)
                            .map(|candidate| RankedResult::from_rerank(candidate, hit.relevance))
                    })
                    .take(requested_count)
                    .collect();
                (results, true)
            }
            Ok(_) => {
                warn!("Reranker returned no results; keeping similarity order");
                (by_similarity(candidates, requested_count), false)
            }
            Err(e) => {
                warn!(error = %e, "Reranking failed; keeping similarity order");
                (by_similarity(candidates, requested_count), false)
            }
        }
    }
}

/// Stable sort by similarity, then truncate.
fn by_similarity(candidates: Vec<RetrievalCandidate>, requested_count: usize) -> Vec<RankedResult> {
    let mut results: Vec<RankedResult> = candidates
        .into_iter()
        .map(RankedResult::from_similarity)
        .collect();
    results.sort_by(|a, b| {
        b.score_final
            .partial_cmp(&a.score_final)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(requested_count);
    results
}

/// Formatted retrieval context for a query, as consumed by the evaluation engine.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn context_for(
        &self,
        query: &str,
        context: &EducationalContext,
    ) -> RetrievalResult<String>;
}

#[async_trait]
impl<S: PassageStore + 'static> ContextSource for ContextRetriever<S> {
    async fn context_for(
        &self,
        query: &str,
        context: &EducationalContext,
    ) -> RetrievalResult<String> {
        self.retrieve_formatted(query, context, self.default_options())
            .await
    }
}
