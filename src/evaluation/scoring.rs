//! Maps a decoded model answer onto the rubric.
//!
//! The level is recomputed from the per-condition verdicts under each level's AND/OR
//! logic; the score always comes from the canonical table. Contradictions between the
//! answer and the rubric are reported, never corrected.

use std::collections::HashMap;

use tracing::warn;

use super::response::{ModelCondition, ModelEvaluation};
use super::types::ConditionOutcome;
use crate::rubric::{Level, PerformanceLevel, RubricIndicator, check_criteria};

/// Rubric-consistent reading of a model answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAnswer {
    pub claimed_level: Level,
    pub level: Level,
    pub score: f64,
    pub satisfied_count: usize,
    pub total_count: usize,
    pub level_adjusted: bool,
    pub outcomes: Vec<ConditionOutcome>,
}

/// Why an answer contradicts the rubric.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoringIssue {
    /// The level name is not one of the four. Treated as undecodable.
    UnknownLevel(String),
    Inconsistent(String),
}

/// Verdicts keyed by condition id. A condition reported more than once counts as
/// satisfied if any report says so.
struct Verdicts<'a> {
    by_id: HashMap<&'a str, &'a ModelCondition>,
}

impl<'a> Verdicts<'a> {
    fn new(conditions: &'a [ModelCondition]) -> Self {
        let mut by_id: HashMap<&str, &ModelCondition> = HashMap::new();
        for condition in conditions {
            by_id
                .entry(condition.condicion_id.trim())
                .and_modify(|existing| {
                    if condition.cumple && !existing.cumple {
                        *existing = condition;
                    }
                })
                .or_insert(condition);
        }
        Self { by_id }
    }

    fn satisfied(&self, id: &str) -> bool {
        self.by_id.get(id).is_some_and(|c| c.cumple)
    }

    fn satisfied_in(&self, level: &PerformanceLevel) -> usize {
        level
            .conditions
            .iter()
            .filter(|c| self.satisfied(&c.id))
            .count()
    }

    /// The floor level always qualifies; any other level needs its logic satisfied.
    fn qualifies(&self, level: &PerformanceLevel) -> bool {
        level.level == Level::Insatisfactorio
            || level
                .logic
                .is_satisfied(self.satisfied_in(level), level.conditions.len())
    }
}

/// Validates `answer` against `indicator` and derives the reported level.
///
/// The claimed level stands when its own conditions qualify it. Otherwise the highest
/// lower level that does qualify is reported and `level_adjusted` is set.
pub fn score_answer(
    indicator: &RubricIndicator,
    answer: &ModelEvaluation,
    artifact: &str,
) -> Result<ScoredAnswer, ScoringIssue> {
    let claimed_level = Level::from_name(&answer.nivel_alcanzado)
        .ok_or_else(|| ScoringIssue::UnknownLevel(answer.nivel_alcanzado.clone()))?;

    if (answer.puntaje - claimed_level.score()).abs() > f64::EPSILON {
        return Err(ScoringIssue::Inconsistent(format!(
            "score {} does not match level {} ({:.1})",
            answer.puntaje,
            claimed_level,
            claimed_level.score()
        )));
    }

    let verdicts = Verdicts::new(&answer.condiciones_evaluadas);
    check_required_evidence(indicator, &verdicts)?;

    let claimed = indicator.level(claimed_level);
    let claimed_satisfied = verdicts.satisfied_in(claimed);
    let claimed_total = claimed.conditions.len();

    if let (Some(satisfied), Some(total)) = (answer.condiciones_cumplidas, answer.condiciones_totales)
        && satisfied > total
    {
        return Err(ScoringIssue::Inconsistent(format!(
            "{satisfied} conditions satisfied out of {total}"
        )));
    }
    if let Some(total) = answer.condiciones_totales
        && total != claimed_total
    {
        return Err(ScoringIssue::Inconsistent(format!(
            "level {claimed_level} has {claimed_total} conditions, answer reports {total}"
        )));
    }
    if let Some(satisfied) = answer.condiciones_cumplidas
        && satisfied != claimed_satisfied
    {
        return Err(ScoringIssue::Inconsistent(format!(
            "answer reports {satisfied} satisfied conditions for {claimed_level}, \
             its verdicts show {claimed_satisfied}"
        )));
    }

    let level = if verdicts.qualifies(claimed) {
        claimed_level
    } else {
        indicator
            .levels
            .descending()
            .filter(|l| l.level < claimed_level)
            .find(|l| verdicts.qualifies(l))
            .map(|l| l.level)
            .unwrap_or(Level::Insatisfactorio)
    };
    let level_adjusted = level != claimed_level;
    if level_adjusted {
        warn!(
            indicator_id = %indicator.indicator_id,
            claimed = %claimed_level,
            logic = claimed.logic.as_str(),
            satisfied = claimed_satisfied,
            total = claimed_total,
            reported = %level,
            "Claimed level not supported by condition verdicts"
        );
    }

    let achieved = indicator.level(level);
    Ok(ScoredAnswer {
        claimed_level,
        level,
        score: level.score(),
        satisfied_count: verdicts.satisfied_in(achieved),
        total_count: achieved.conditions.len(),
        level_adjusted,
        outcomes: outcomes(indicator, answer, artifact),
    })
}

fn check_required_evidence(
    indicator: &RubricIndicator,
    verdicts: &Verdicts<'_>,
) -> Result<(), ScoringIssue> {
    for level in indicator.levels.ascending() {
        for condition in level.conditions.iter().filter(|c| c.evidence_required) {
            if let Some(verdict) = verdicts.by_id.get(condition.id.as_str())
                && verdict.cumple
                && verdict.evidencia_textual.trim().is_empty()
            {
                return Err(ScoringIssue::Inconsistent(format!(
                    "condition {} is marked satisfied without the required evidence",
                    condition.id
                )));
            }
        }
    }
    Ok(())
}

/// Outcomes in the model's order, with rubric wording and the criteria pre-check
/// for known ids. Unknown ids are kept as reported but never count toward a level.
fn outcomes(
    indicator: &RubricIndicator,
    answer: &ModelEvaluation,
    artifact: &str,
) -> Vec<ConditionOutcome> {
    answer
        .condiciones_evaluadas
        .iter()
        .map(|reported| {
            let id = reported.condicion_id.trim();
            let condition = indicator
                .levels
                .level_of_condition(id)
                .and_then(|level| indicator.level(level).condition(id));

            let criteria = condition.and_then(|c| match check_criteria(c, artifact) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(condition_id = id, error = %e, "Criteria pre-check failed");
                    None
                }
            });
            if condition.is_none() {
                warn!(
                    indicator_id = %indicator.indicator_id,
                    condition_id = id,
                    "Answer references a condition not in the rubric"
                );
            }

            ConditionOutcome {
                condition_id: id.to_string(),
                description: condition
                    .map(|c| c.description.clone())
                    .unwrap_or_else(|| reported.descripcion.clone()),
                satisfied: reported.cumple,
                evidence: reported.evidencia_textual.clone(),
                rationale: reported.razon.clone(),
                criteria,
            }
        })
        .collect()
}
