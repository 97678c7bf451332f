use std::time::Duration;

use crate::config::ConfigError;
use crate::constants::{
    DEFAULT_MAX_CONCURRENT_EVALUATIONS, DEFAULT_MAX_TOKENS, DEFAULT_REASONING_MODEL,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TEMPERATURE,
};
use crate::rubric::CategoryTable;

/// Reasoning-model options and the evaluation concurrency budget.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Indicators of one artifact evaluated at the same time.
    pub max_concurrent: usize,
    pub timeout: Duration,
    pub categories: CategoryTable,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_REASONING_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_concurrent: DEFAULT_MAX_CONCURRENT_EVALUATIONS,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            categories: CategoryTable::default(),
        }
    }
}

impl EvaluationConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: "RUBRICA_REASONING_MODEL",
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::OutOfRange {
                name: "RUBRICA_TEMPERATURE",
                reason: "temperature must lie within 0.0 and 2.0".to_string(),
            });
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                name: "RUBRICA_MAX_TOKENS",
                reason: "max tokens must be positive".to_string(),
            });
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::OutOfRange {
                name: "RUBRICA_MAX_CONCURRENT_EVALUATIONS",
                reason: "at least one evaluation must be allowed".to_string(),
            });
        }
        self.categories.validate()
    }
}
