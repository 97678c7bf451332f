//! Cross-encoder reranking of an over-fetched candidate pool.

pub mod config;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use config::RerankerConfig;
pub use error::RerankerError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockReranker;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One reranked document: its index in the submitted list and its relevance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankHit {
    pub index: usize,
    #[serde(rename = "relevance_score")]
    pub relevance: f32,
}

/// Relevance scoring of documents against a query.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Returns at most `top_n` hits, best first. Every index is `< documents.len()`.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, RerankerError>;
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
    return_documents: bool,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankHit>,
}

/// Client for a Cohere-compatible `/v1/rerank` endpoint.
pub struct HttpReranker {
    http: HttpClient,
    config: RerankerConfig,
}

impl std::fmt::Debug for HttpReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReranker")
            .field("config", &self.config)
            .finish()
    }
}

impl HttpReranker {
    pub fn new(config: RerankerConfig) -> Result<Self, RerankerError> {
        config
            .validate()
            .map_err(|e| RerankerError::InvalidConfig {
                reason: e.to_string(),
            })?;

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RerankerError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    /// Builds a client only when an API key is configured.
    pub fn from_config(config: &RerankerConfig) -> Result<Option<Self>, RerankerError> {
        if !config.is_enabled() {
            return Ok(None);
        }
        Self::new(config.clone()).map(Some)
    }
}

/// Rejects any hit pointing outside the submitted documents.
pub(crate) fn check_indices(hits: &[RerankHit], len: usize) -> Result<(), RerankerError> {
    match hits.iter().find(|hit| hit.index >= len) {
        Some(hit) => Err(RerankerError::InvalidIndex {
            index: hit.index,
            len,
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    #[instrument(skip(self, query, documents), fields(model = %self.config.model, documents = documents.len()))]
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, RerankerError> {
        if documents.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        let body = RerankRequest {
            model: &self.config.model,
            query,
            documents,
            top_n: top_n.min(documents.len()),
            return_documents: false,
        };

        let mut request = self.http.post(&self.config.url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RerankerError::Timeout {
                    timeout_secs: self.config.timeout.as_secs(),
                }
            } else {
                RerankerError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RerankerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RerankResponse =
            response
                .json()
                .await
                .map_err(|e| RerankerError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        check_indices(&parsed.results, documents.len())?;

        let mut hits = parsed.results;
        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_n);

        debug!(hits = hits.len(), "Rerank complete");
        Ok(hits)
    }
}
