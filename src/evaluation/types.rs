use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::EvaluationError;
use crate::context::EducationalContext;
use crate::rubric::{Category, CriteriaReport, Level};

/// Verdict on one rubric condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionOutcome {
    #[serde(rename = "condicion_id")]
    pub condition_id: String,
    /// Verbatim rubric text when the id is known, otherwise the model's wording.
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "cumple")]
    pub satisfied: bool,
    /// Quote from the artifact.
    #[serde(rename = "evidencia_textual", default)]
    pub evidence: String,
    #[serde(rename = "razon", default)]
    pub rationale: String,
    /// Machine-side check of the condition's criteria. Advisory only.
    #[serde(
        rename = "verificacion_automatica",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub criteria: Option<CriteriaReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[serde(alias = "Alta", alias = "ALTA")]
    Alta,
    #[serde(alias = "Media", alias = "MEDIA")]
    Media,
    #[serde(alias = "Baja", alias = "BAJA")]
    Baja,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "prioridad")]
    pub priority: Priority,
    #[serde(rename = "accion")]
    pub action: String,
    #[serde(rename = "impacto", default)]
    pub impact: String,
}

/// Validated outcome of one indicator for one artifact. Immutable once stored;
/// re-evaluating produces a new `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub id: Uuid,
    pub indicator_id: String,
    #[serde(rename = "nombre_indicador")]
    pub indicator_name: String,
    /// Hex BLAKE3 digest of the artifact text.
    pub artifact_hash: String,
    /// 1 for the first stored evaluation of this (artifact, indicator) pair.
    pub version: u32,
    #[serde(rename = "contexto")]
    pub context: EducationalContext,
    #[serde(rename = "nivel_alcanzado")]
    pub level: Level,
    /// Always the canonical score of `level`.
    #[serde(rename = "puntaje")]
    pub score: f64,
    #[serde(rename = "condiciones_cumplidas")]
    pub satisfied_count: usize,
    /// Condition count of the achieved level.
    #[serde(rename = "condiciones_totales")]
    pub total_count: usize,
    #[serde(rename = "condiciones_evaluadas")]
    pub conditions: Vec<ConditionOutcome>,
    #[serde(rename = "evidencias_textuales")]
    pub evidence: Vec<String>,
    #[serde(rename = "justificacion")]
    pub justification: String,
    #[serde(rename = "para_siguiente_nivel", skip_serializing_if = "Option::is_none")]
    pub next_level: Option<String>,
    #[serde(rename = "fortalezas", default)]
    pub strengths: Vec<String>,
    #[serde(rename = "recomendaciones")]
    pub recommendations: Vec<Recommendation>,
    /// Level the model claimed before condition logic was applied.
    #[serde(rename = "nivel_reportado")]
    pub claimed_level: Level,
    #[serde(rename = "correccion_aplicada")]
    pub level_adjusted: bool,
    #[serde(rename = "nota_correccion", skip_serializing_if = "Option::is_none")]
    pub adjustment_note: Option<String>,
    #[serde(rename = "promedio_nacional", skip_serializing_if = "Option::is_none")]
    pub national_mean: Option<f64>,
    #[serde(rename = "desviacion_estandar", skip_serializing_if = "Option::is_none")]
    pub national_std_dev: Option<f64>,
    #[serde(rename = "percentil", skip_serializing_if = "Option::is_none")]
    pub percentile: Option<u8>,
    #[serde(rename = "modelo")]
    pub model: String,
    #[serde(rename = "tokens_utilizados", skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    #[serde(rename = "tiempo_ms")]
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Every indicator of one artifact. Failed indicators stay in `failures` so the
/// caller can retry them individually.
#[derive(Debug)]
pub struct ArtifactEvaluation {
    pub artifact_hash: String,
    pub results: Vec<EvaluationResult>,
    pub failures: Vec<EvaluationError>,
    /// Mean score of the successful indicators.
    pub average_score: Option<f64>,
    pub category: Option<Category>,
    /// All recommendations, `alta` first, then `media`, then `baja`.
    pub recommendations: Vec<Recommendation>,
}

impl ArtifactEvaluation {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn result(&self, indicator_id: &str) -> Option<&EvaluationResult> {
        self.results.iter().find(|r| r.indicator_id == indicator_id)
    }
}
