use std::time::Duration;

use crate::config::ConfigError;
use crate::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RERANK_MODEL, DEFAULT_RERANK_URL};

#[derive(Clone)]
pub struct RerankerConfig {
    /// Cohere-compatible rerank endpoint.
    pub url: String,
    pub model: String,
    /// Reranking is enabled only when a key is present.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RERANK_URL.to_string(),
            model: DEFAULT_RERANK_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl std::fmt::Debug for RerankerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankerConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RerankerConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: "RUBRICA_RERANK_URL",
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: "RUBRICA_RERANK_MODEL",
            });
        }
        Ok(())
    }
}
