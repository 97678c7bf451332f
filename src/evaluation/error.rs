use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::retrieval::RetrievalError;

/// Stage of a single (artifact, indicator) evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStage {
    Assembled,
    Dispatched,
    Parsed,
    Scored,
}

impl std::fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EvaluationStage::Assembled => "assembled",
            EvaluationStage::Dispatched => "dispatched",
            EvaluationStage::Parsed => "parsed",
            EvaluationStage::Scored => "scored",
        };
        f.write_str(name)
    }
}

/// Failure of the reasoning-model call itself.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("reasoning model request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("reasoning model timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("reasoning model returned no text")]
    EmptyResponse,
}

/// A failed indicator evaluation. Every variant names the indicator, and
/// [`stage`](Self::stage) tells the caller where the pipeline stopped.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("context retrieval failed for {indicator_id}: {source}")]
    Retrieval {
        indicator_id: String,
        #[source]
        source: RetrievalError,
    },

    #[error("reasoning model failed for {indicator_id}: {source}")]
    Model {
        indicator_id: String,
        #[source]
        source: ModelError,
    },

    #[error("unparsable model answer for {indicator_id}: {reason}")]
    Parse { indicator_id: String, reason: String },

    #[error("inconsistent model answer for {indicator_id}: {reason}")]
    ScoreInconsistency { indicator_id: String, reason: String },
}

impl EvaluationError {
    pub fn stage(&self) -> EvaluationStage {
        match self {
            EvaluationError::Retrieval { .. } => EvaluationStage::Assembled,
            EvaluationError::Model { .. } => EvaluationStage::Dispatched,
            EvaluationError::Parse { .. } => EvaluationStage::Parsed,
            EvaluationError::ScoreInconsistency { .. } => EvaluationStage::Scored,
        }
    }

    pub fn indicator_id(&self) -> &str {
        match self {
            EvaluationError::Retrieval { indicator_id, .. }
            | EvaluationError::Model { indicator_id, .. }
            | EvaluationError::Parse { indicator_id, .. }
            | EvaluationError::ScoreInconsistency { indicator_id, .. } => indicator_id,
        }
    }
}

/// Result alias for evaluation operations.
pub type EvalResult<T> = Result<T, EvaluationError>;
