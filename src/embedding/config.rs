use std::time::Duration;

use crate::config::ConfigError;
use crate::constants::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};

/// Configuration for [`HttpEmbedder`](super::HttpEmbedder) and the in-process cache tier.
#[derive(Clone)]
pub struct EmbeddingConfig {
    /// OpenAI-compatible embeddings endpoint.
    pub url: String,
    pub model: String,
    /// Requested and expected vector length.
    pub dimensions: usize,
    pub api_key: Option<String>,
    /// Max entries kept in memory in front of the persistent cache.
    pub cache_capacity: u64,
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_EMBEDDING_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIM,
            api_key: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("cache_capacity", &self.cache_capacity)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl EmbeddingConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: "RUBRICA_EMBEDDING_URL",
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: "RUBRICA_EMBEDDING_MODEL",
            });
        }
        if self.dimensions == 0 {
            return Err(ConfigError::OutOfRange {
                name: "RUBRICA_EMBEDDING_DIM",
                reason: "dimensions must be positive".to_string(),
            });
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                name: "RUBRICA_CACHE_CAPACITY",
                reason: "capacity must be positive".to_string(),
            });
        }
        Ok(())
    }
}
