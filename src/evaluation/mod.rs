//! Evaluation of artifacts against rubric indicators.
//!
//! One reasoning-model call per indicator. The answer is decoded, then checked against
//! the rubric: the reported level follows the condition verdicts and the score is
//! always the canonical one for that level. Contradictions surface as
//! [`EvaluationError::ScoreInconsistency`].

pub mod config;
pub mod engine;
mod error;
pub mod llm;
pub mod prompt;
pub mod repository;
pub mod response;
pub mod scoring;
pub mod types;


pub use config::EvaluationConfig;
pub use engine::EvaluationEngine;
pub use error::{EvalResult, EvaluationError, EvaluationStage, ModelError};
#[cfg(any(test, feature = "mock"))]
pub use llm::MockReasoningModel;
pub use llm::{GenaiReasoningModel, ModelCompletion, ReasoningModel};
pub use prompt::{SYSTEM_PROMPT, build_prompt};
pub use repository::{EvaluationRepository, save_all};
pub use response::{ModelEvaluation, parse_response};
pub use scoring::{ScoredAnswer, score_answer};
pub use types::{ArtifactEvaluation, ConditionOutcome, EvaluationResult, Priority, Recommendation};
