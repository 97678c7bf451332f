//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `RUBRICA_*` environment variables.
//! Build one [`Config`] at startup and hand the relevant sub-config to each component.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::embedding::EmbeddingConfig;
use crate::evaluation::EvaluationConfig;
use crate::reranker::RerankerConfig;
use crate::retrieval::RetrieverConfig;
use crate::rubric::CategoryTable;
use crate::telemetry::TelemetryConfig;

/// Default Qdrant URL used when `RUBRICA_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Default passage collection name.
pub const DEFAULT_COLLECTION: &str = "rubric_passages";

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub reranker: RerankerConfig,
    pub retriever: RetrieverConfig,
    pub evaluation: EvaluationConfig,
    pub telemetry: TelemetryConfig,

    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Collection holding rubric and standard passages. Default: `rubric_passages`.
    pub collection: String,

    /// SQLite database file. Default: `./.data/rubrica.db`.
    pub db_path: PathBuf,

    /// Timeout applied to every external call. Default: 60s.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            reranker: RerankerConfig::default(),
            retriever: RetrieverConfig::default(),
            evaluation: EvaluationConfig::default(),
            telemetry: TelemetryConfig::default(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            db_path: PathBuf::from("./.data/rubrica.db"),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Config {
    const ENV_EMBEDDING_URL: &'static str = "RUBRICA_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "RUBRICA_EMBEDDING_MODEL";
    const ENV_EMBEDDING_DIM: &'static str = "RUBRICA_EMBEDDING_DIM";
    const ENV_EMBEDDING_API_KEY: &'static str = "RUBRICA_EMBEDDING_API_KEY";
    const ENV_QDRANT_URL: &'static str = "RUBRICA_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "RUBRICA_COLLECTION";
    const ENV_RERANK_URL: &'static str = "RUBRICA_RERANK_URL";
    const ENV_RERANK_MODEL: &'static str = "RUBRICA_RERANK_MODEL";
    const ENV_RERANK_API_KEY: &'static str = "RUBRICA_RERANK_API_KEY";
    const ENV_REASONING_MODEL: &'static str = "RUBRICA_REASONING_MODEL";
    const ENV_TEMPERATURE: &'static str = "RUBRICA_TEMPERATURE";
    const ENV_MAX_TOKENS: &'static str = "RUBRICA_MAX_TOKENS";
    const ENV_REQUEST_TIMEOUT_SECS: &'static str = "RUBRICA_REQUEST_TIMEOUT_SECS";
    const ENV_DB_PATH: &'static str = "RUBRICA_DB_PATH";
    const ENV_CACHE_CAPACITY: &'static str = "RUBRICA_CACHE_CAPACITY";
    const ENV_MAX_CONCURRENT_EVALUATIONS: &'static str = "RUBRICA_MAX_CONCURRENT_EVALUATIONS";
    const ENV_CATEGORY_THRESHOLDS: &'static str = "RUBRICA_CATEGORY_THRESHOLDS";
    const ENV_TELEMETRY_QUEUE: &'static str = "RUBRICA_TELEMETRY_QUEUE";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_secs =
            Self::parse_from_env(Self::ENV_REQUEST_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let request_timeout = Duration::from_secs(timeout_secs);

        let embedding = EmbeddingConfig {
            url: Self::parse_string_from_env(Self::ENV_EMBEDDING_URL, defaults.embedding.url),
            model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding.model,
            ),
            dimensions: Self::parse_from_env(
                Self::ENV_EMBEDDING_DIM,
                defaults.embedding.dimensions,
            )?,
            api_key: Self::parse_optional_from_env(Self::ENV_EMBEDDING_API_KEY),
            cache_capacity: Self::parse_from_env(
                Self::ENV_CACHE_CAPACITY,
                DEFAULT_CACHE_CAPACITY,
            )?,
            timeout: request_timeout,
        };

        let reranker = RerankerConfig {
            url: Self::parse_string_from_env(Self::ENV_RERANK_URL, defaults.reranker.url),
            model: Self::parse_string_from_env(Self::ENV_RERANK_MODEL, defaults.reranker.model),
            api_key: Self::parse_optional_from_env(Self::ENV_RERANK_API_KEY),
            timeout: request_timeout,
        };

        let categories = match Self::parse_optional_from_env(Self::ENV_CATEGORY_THRESHOLDS) {
            Some(value) => value.parse::<CategoryTable>()?,
            None => defaults.evaluation.categories,
        };

        let evaluation = EvaluationConfig {
            model: Self::parse_string_from_env(
                Self::ENV_REASONING_MODEL,
                defaults.evaluation.model,
            ),
            temperature: Self::parse_from_env(
                Self::ENV_TEMPERATURE,
                defaults.evaluation.temperature,
            )?,
            max_tokens: Self::parse_from_env(
                Self::ENV_MAX_TOKENS,
                defaults.evaluation.max_tokens,
            )?,
            max_concurrent: Self::parse_from_env(
                Self::ENV_MAX_CONCURRENT_EVALUATIONS,
                defaults.evaluation.max_concurrent,
            )?,
            timeout: request_timeout,
            categories,
        };

        let telemetry = TelemetryConfig {
            queue_capacity: Self::parse_from_env(
                Self::ENV_TELEMETRY_QUEUE,
                defaults.telemetry.queue_capacity,
            )?,
        };

        let config = Self {
            embedding,
            reranker,
            retriever: defaults.retriever,
            evaluation,
            telemetry,
            qdrant_url: Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url),
            collection: Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection),
            db_path: Self::parse_path_from_env(Self::ENV_DB_PATH, defaults.db_path),
            request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates every sub-config and the database path (does not create anything).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.reranker.validate()?;
        self.retriever.validate()?;
        self.evaluation.validate()?;
        self.telemetry.validate()?;

        if self.qdrant_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: Self::ENV_QDRANT_URL,
            });
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: Self::ENV_COLLECTION,
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_REQUEST_TIMEOUT_SECS,
                reason: "timeout must be at least one second".to_string(),
            });
        }

        if self.db_path.is_dir() {
            return Err(ConfigError::NotAFile {
                path: self.db_path.clone(),
            });
        }
        if let Some(parent) = self.db_path.parent()
            && parent.exists()
            && !parent.is_dir()
        {
            return Err(ConfigError::NotADirectory {
                path: parent.to_path_buf(),
            });
        }

        Ok(())
    }

    fn parse_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::ParseError {
                    name: var_name,
                    value,
                    reason: e.to_string(),
                }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }
}
