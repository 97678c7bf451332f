use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::config::EvaluationConfig;
use super::error::{EvalResult, EvaluationError};
use super::llm::ReasoningModel;
use super::prompt::{SYSTEM_PROMPT, build_prompt};
use super::response::parse_response;
use super::scoring::{ScoringIssue, score_answer};
use super::types::{ArtifactEvaluation, EvaluationResult, Recommendation};
use crate::context::EducationalContext;
use crate::hashing::artifact_digest;
use crate::retrieval::{ContextSource, no_context_message};
use crate::rubric::{IndicatorStatistics, Level, RubricIndicator, StatisticsSource};

const ADJUSTMENT_NOTE: &str =
    "El nivel fue ajustado automáticamente según la lógica de condiciones";

/// Runs `Assembled → Dispatched → Parsed → Scored` for each (artifact, indicator) pair.
pub struct EvaluationEngine {
    model: Arc<dyn ReasoningModel>,
    context: Option<Arc<dyn ContextSource>>,
    statistics: Option<Arc<dyn StatisticsSource>>,
    config: EvaluationConfig,
}

impl std::fmt::Debug for EvaluationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationEngine")
            .field("model", &self.model.model_name())
            .field("context", &self.context.is_some())
            .field("statistics", &self.statistics.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl EvaluationEngine {
    pub fn new(model: Arc<dyn ReasoningModel>, config: EvaluationConfig) -> Self {
        Self {
            model,
            context: None,
            statistics: None,
            config,
        }
    }

    /// Retrieves framework passages for every indicator prompt.
    pub fn with_context_source(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.context = Some(source);
        self
    }

    pub fn with_statistics(mut self, statistics: Arc<dyn StatisticsSource>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluates one indicator. Nothing is stored; `version` is 1 until a repository
    /// assigns the real one.
    #[instrument(skip(self, artifact, context, indicator), fields(indicator_id = %indicator.indicator_id))]
    pub async fn evaluate_indicator(
        &self,
        artifact: &str,
        context: &EducationalContext,
        indicator: &RubricIndicator,
    ) -> EvalResult<EvaluationResult> {
        let started = Instant::now();
        let indicator_id = indicator.indicator_id.clone();

        let context_block = match &self.context {
            Some(source) => source
                .context_for(&retrieval_query(indicator), context)
                .await
                .map_err(|source| EvaluationError::Retrieval {
                    indicator_id: indicator_id.clone(),
                    source,
                })?,
            None => no_context_message(context.year),
        };
        let prompt = build_prompt(indicator, artifact, &context_block);
        debug!(prompt_len = prompt.len(), "Evaluation request assembled");

        let completion = self
            .model
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|source| {
                error!(error = %source, "Reasoning model call failed");
                EvaluationError::Model {
                    indicator_id: indicator_id.clone(),
                    source,
                }
            })?;
        debug!(answer_len = completion.content.len(), "Model answered");

        let answer = parse_response(&completion.content).map_err(|reason| {
            error!(%reason, "Model answer could not be parsed");
            EvaluationError::Parse {
                indicator_id: indicator_id.clone(),
                reason,
            }
        })?;

        let scored = score_answer(indicator, &answer, artifact).map_err(|issue| {
            let err = match issue {
                ScoringIssue::UnknownLevel(name) => EvaluationError::Parse {
                    indicator_id: indicator_id.clone(),
                    reason: format!("unknown level {name:?}"),
                },
                ScoringIssue::Inconsistent(reason) => EvaluationError::ScoreInconsistency {
                    indicator_id: indicator_id.clone(),
                    reason,
                },
            };
            error!(error = %err, "Model answer rejected");
            err
        })?;

        let statistics = self.statistics(indicator, context).await;

        let next_level = if scored.level_adjusted {
            gap_to_next_level(indicator, scored.level)
        } else {
            answer
                .para_siguiente_nivel
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| gap_to_next_level(indicator, scored.level))
        };

        let mut seen = HashSet::new();
        let evidence: Vec<String> = answer
            .evidencias_destacadas
            .iter()
            .chain(
                scored
                    .outcomes
                    .iter()
                    .filter(|o| o.satisfied)
                    .map(|o| &o.evidence),
            )
            .map(|e| e.trim())
            .filter(|e| !e.is_empty() && seen.insert(e.to_string()))
            .map(str::to_string)
            .collect();

        let result = EvaluationResult {
            id: Uuid::new_v4(),
            indicator_id,
            indicator_name: indicator.name.clone(),
            artifact_hash: artifact_digest(artifact),
            version: 1,
            context: context.clone(),
            level: scored.level,
            score: scored.score,
            satisfied_count: scored.satisfied_count,
            total_count: scored.total_count,
            conditions: scored.outcomes,
            evidence,
            justification: answer.justificacion,
            next_level,
            strengths: answer.fortalezas,
            recommendations: answer.recomendaciones,
            claimed_level: scored.claimed_level,
            level_adjusted: scored.level_adjusted,
            adjustment_note: scored.level_adjusted.then(|| ADJUSTMENT_NOTE.to_string()),
            national_mean: statistics.map(|s| s.mean),
            national_std_dev: statistics.map(|s| s.std_dev),
            percentile: statistics.map(|s| s.percentile(scored.score)),
            model: completion.model,
            tokens_used: completion.tokens_used,
            elapsed_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };

        info!(
            level = %result.level,
            score = result.score,
            satisfied = result.satisfied_count,
            total = result.total_count,
            adjusted = result.level_adjusted,
            "Indicator evaluated"
        );
        Ok(result)
    }

    /// Evaluates every indicator, at most `max_concurrent` at a time. A failed indicator
    /// does not stop the others.
    #[instrument(skip_all, fields(indicators = indicators.len()))]
    pub async fn evaluate_artifact(
        &self,
        artifact: &str,
        context: &EducationalContext,
        indicators: &[RubricIndicator],
    ) -> ArtifactEvaluation {
        let outcomes: Vec<EvalResult<EvaluationResult>> = stream::iter(
            indicators
                .iter()
                .map(|indicator| self.evaluate_indicator(artifact, context, indicator)),
        )
        .buffered(self.config.max_concurrent.max(1))
        .collect()
        .await;

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => failures.push(e),
            }
        }

        let average_score = if results.is_empty() {
            None
        } else {
            Some(results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64)
        };
        let category = average_score.map(|score| self.config.categories.categorize(score));

        let mut recommendations: Vec<Recommendation> = results
            .iter()
            .flat_map(|r| r.recommendations.iter().cloned())
            .collect();
        recommendations.sort_by_key(|r| r.priority);

        info!(
            succeeded = results.len(),
            failed = failures.len(),
            average_score,
            category = category.map(|c| c.as_str()),
            "Artifact evaluated"
        );

        ArtifactEvaluation {
            artifact_hash: artifact_digest(artifact),
            results,
            failures,
            average_score,
            category,
            recommendations,
        }
    }

    async fn statistics(
        &self,
        indicator: &RubricIndicator,
        context: &EducationalContext,
    ) -> Option<IndicatorStatistics> {
        let source = self.statistics.as_ref()?;
        match source
            .statistics(&indicator.indicator_id, context.year, &indicator.level)
            .await
        {
            Ok(stats) => stats,
            Err(e) => {
                debug!(error = %e, "No national statistics for indicator");
                None
            }
        }
    }
}

/// Query used to retrieve framework passages for an indicator.
fn retrieval_query(indicator: &RubricIndicator) -> String {
    format!("{} {}", indicator.name, indicator.description)
}

fn gap_to_next_level(indicator: &RubricIndicator, level: Level) -> Option<String> {
    let next = level.next_higher()?;
    Some(format!(
        "Para alcanzar nivel {}: {}",
        next,
        indicator.level(next).description
    ))
}
