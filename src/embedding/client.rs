use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::config::EmbeddingConfig;
use super::error::{EmbeddingError, EmbeddingResult};

/// Turns text into a fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Vector length this embedder produces.
    fn dimensions(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct HttpEmbedder {
    http: HttpClient,
    config: EmbeddingConfig,
}

impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("url", &self.config.url)
            .field("model", &self.config.model)
            .field("dimensions", &self.config.dimensions)
            .finish()
    }
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> EmbeddingResult<Self> {
        config
            .validate()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: e.to_string(),
            })?;

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn map_send_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::Timeout {
                timeout_secs: self.config.timeout.as_secs(),
            }
        } else {
            EmbeddingError::from(err)
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    #[instrument(skip(self, text), fields(model = %self.config.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let body = EmbeddingRequest {
            model: &self.config.model,
            input: text,
            dimensions: self.config.dimensions,
        };

        let mut request = self.http.post(&self.config.url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::InvalidResponse {
                    reason: e.to_string(),
                })?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse {
                reason: "response contained no embeddings".to_string(),
            })?;

        if vector.len() != self.config.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimensions,
                found: vector.len(),
            });
        }

        debug!(dimensions = vector.len(), "Embedding computed");
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }
}
