use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::EducationalContext;

use super::error::RubricError;

/// The four ordinal performance levels, declared lowest first so `Ord` follows score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    Insatisfactorio,
    Basico,
    Competente,
    Destacado,
}

impl Level {
    /// All levels in ascending order.
    pub const ASCENDING: [Level; 4] = [
        Level::Insatisfactorio,
        Level::Basico,
        Level::Competente,
        Level::Destacado,
    ];

    /// Canonical numeric score. Never taken from model output.
    #[inline]
    pub fn score(self) -> f64 {
        match self {
            Level::Insatisfactorio => 1.0,
            Level::Basico => 2.0,
            Level::Competente => 3.0,
            Level::Destacado => 4.0,
        }
    }

    /// Canonical display name as it appears in the source rubrics.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Insatisfactorio => "Insatisfactorio",
            Level::Basico => "Básico",
            Level::Competente => "Competente",
            Level::Destacado => "Destacado",
        }
    }

    /// Key used in the fixed-key `niveles_desempeno` object.
    #[inline]
    pub fn key(self) -> &'static str {
        match self {
            Level::Insatisfactorio => "insatisfactorio",
            Level::Basico => "basico",
            Level::Competente => "competente",
            Level::Destacado => "destacado",
        }
    }

    #[inline]
    pub fn letter(self) -> char {
        match self {
            Level::Insatisfactorio => 'I',
            Level::Basico => 'B',
            Level::Competente => 'C',
            Level::Destacado => 'D',
        }
    }

    /// Parses a level name, ignoring case, padding and the accent in "Básico".
    pub fn from_name(name: &str) -> Option<Self> {
        let folded: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == 'á' { 'a' } else { c })
            .collect();
        match folded.as_str() {
            "insatisfactorio" => Some(Level::Insatisfactorio),
            "basico" => Some(Level::Basico),
            "competente" => Some(Level::Competente),
            "destacado" => Some(Level::Destacado),
            _ => None,
        }
    }

    /// Level whose canonical score equals `score` exactly.
    pub fn from_score(score: f64) -> Option<Self> {
        Self::ASCENDING
            .into_iter()
            .find(|level| (level.score() - score).abs() < f64::EPSILON)
    }

    pub fn next_lower(self) -> Option<Self> {
        match self {
            Level::Insatisfactorio => None,
            Level::Basico => Some(Level::Insatisfactorio),
            Level::Competente => Some(Level::Basico),
            Level::Destacado => Some(Level::Competente),
        }
    }

    pub fn next_higher(self) -> Option<Self> {
        match self {
            Level::Insatisfactorio => Some(Level::Basico),
            Level::Basico => Some(Level::Competente),
            Level::Competente => Some(Level::Destacado),
            Level::Destacado => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Level {
    type Error = RubricError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Level::from_name(&value).ok_or(RubricError::UnknownLevel { name: value })
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        level.as_str().to_string()
    }
}

/// How a level's conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombinationLogic {
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl CombinationLogic {
    /// AND needs every condition, OR needs at least one. An empty list never qualifies.
    #[inline]
    pub fn is_satisfied(self, satisfied: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        match self {
            CombinationLogic::And => satisfied == total,
            CombinationLogic::Or => satisfied >= 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CombinationLogic::And => "AND",
            CombinationLogic::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationType {
    #[serde(rename = "presencia")]
    Presence,
    #[serde(rename = "calidad")]
    Quality,
    #[serde(rename = "cantidad")]
    Quantity,
    #[serde(rename = "especifica")]
    SpecificPattern,
}

/// Machine-checkable hints attached to a condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(rename = "palabras_clave", default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(rename = "longitud_minima", default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(
        rename = "elementos_requeridos",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required_elements: Vec<String>,
    #[serde(rename = "patron", default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Criteria {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.min_length.is_none()
            && self.required_elements.is_empty()
            && self.pattern.is_none()
    }
}

/// One atomic requirement. `description` is verbatim rubric text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "tipo")]
    pub verification: VerificationType,
    #[serde(rename = "requiere_evidencia", default)]
    pub evidence_required: bool,
    #[serde(rename = "criterios", default)]
    pub criteria: Criteria,
    #[serde(rename = "peso", default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceLevel {
    #[serde(rename = "nivel")]
    pub level: Level,
    #[serde(rename = "puntaje")]
    pub score: f64,
    #[serde(rename = "logica")]
    pub logic: CombinationLogic,
    #[serde(rename = "descripcion", default)]
    pub description: String,
    #[serde(rename = "condiciones", default)]
    pub conditions: Vec<Condition>,
    #[serde(rename = "notas", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PerformanceLevel {
    /// Returns `true` if `satisfied_ids` qualifies a submission for this level.
    pub fn is_met_by<'a, I>(&self, satisfied_ids: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let satisfied: Vec<&str> = satisfied_ids.into_iter().collect();
        let count = self
            .conditions
            .iter()
            .filter(|c| satisfied.contains(&c.id.as_str()))
            .count();
        self.logic.is_satisfied(count, self.conditions.len())
    }

    pub fn condition(&self, id: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id == id)
    }
}

/// Exactly four levels, always serialized as a fixed-key object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceLevels {
    pub insatisfactorio: PerformanceLevel,
    pub basico: PerformanceLevel,
    pub competente: PerformanceLevel,
    pub destacado: PerformanceLevel,
}

impl PerformanceLevels {
    pub fn get(&self, level: Level) -> &PerformanceLevel {
        match level {
            Level::Insatisfactorio => &self.insatisfactorio,
            Level::Basico => &self.basico,
            Level::Competente => &self.competente,
            Level::Destacado => &self.destacado,
        }
    }

    /// Levels from Insatisfactorio up to Destacado.
    pub fn ascending(&self) -> impl DoubleEndedIterator<Item = &PerformanceLevel> {
        Level::ASCENDING.into_iter().map(|level| self.get(level))
    }

    /// Levels from Destacado down to Insatisfactorio.
    pub fn descending(&self) -> impl Iterator<Item = &PerformanceLevel> {
        self.ascending().rev()
    }

    /// Finds the level that owns a condition id.
    pub fn level_of_condition(&self, condition_id: &str) -> Option<Level> {
        self.ascending()
            .find(|lvl| lvl.condition(condition_id).is_some())
            .map(|lvl| lvl.level)
    }
}

/// One scorable rubric dimension with its four levels.
///
/// Deserialization goes through [`RubricRecord`] and is validated, so a value of
/// this type always satisfies the level invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RubricRecord")]
pub struct RubricIndicator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "indicador_id")]
    pub indicator_id: String,
    #[serde(rename = "nombre_indicador")]
    pub name: String,
    #[serde(rename = "descripcion_general")]
    pub description: String,
    #[serde(rename = "dominio", skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(rename = "estandar_numero", skip_serializing_if = "Option::is_none")]
    pub standard_number: Option<u32>,
    #[serde(rename = "año_vigencia")]
    pub year: i32,
    #[serde(rename = "nivel_educativo")]
    pub level: String,
    /// `None` for generalist indicators that apply to every subject.
    #[serde(rename = "asignatura")]
    pub subject: Option<String>,
    #[serde(rename = "modalidad")]
    pub modality: String,
    #[serde(rename = "modulo")]
    pub module: u32,
    #[serde(rename = "tarea")]
    pub task: Option<u32>,
    #[serde(rename = "peso_porcentaje", skip_serializing_if = "Option::is_none")]
    pub weight_percent: Option<f64>,
    #[serde(rename = "niveles_desempeno")]
    pub levels: PerformanceLevels,
    #[serde(rename = "fuente_oficial", skip_serializing_if = "Option::is_none")]
    pub official_source: Option<String>,
    #[serde(rename = "pagina_manual", skip_serializing_if = "Option::is_none")]
    pub manual_page: Option<u32>,
    #[serde(rename = "notas_aclaratorias", skip_serializing_if = "Option::is_none")]
    pub clarifying_notes: Option<String>,
    #[serde(rename = "ejemplos", skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl RubricIndicator {
    /// Parses and validates a single indicator from JSON.
    pub fn from_json(json: &str) -> Result<Self, RubricError> {
        let record: RubricRecord =
            serde_json::from_str(json).map_err(|e| RubricError::Malformed {
                reason: e.to_string(),
            })?;
        Self::try_from(record)
    }

    /// Returns `true` if this indicator applies to `context` (generalist indicators
    /// match any subject).
    pub fn applies_to(&self, context: &EducationalContext) -> bool {
        self.year == context.year
            && self.level == context.level
            && self.modality == context.modality
            && self
                .subject
                .as_deref()
                .is_none_or(|subject| subject == context.subject)
    }

    pub fn level(&self, level: Level) -> &PerformanceLevel {
        self.levels.get(level)
    }

    pub fn total_conditions(&self) -> usize {
        self.levels.ascending().map(|l| l.conditions.len()).sum()
    }
}

/// Unvalidated wire shape of a rubric row, as stored by the extraction pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct RubricRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub indicador_id: String,
    pub nombre_indicador: String,
    #[serde(default)]
    pub descripcion_general: String,
    #[serde(default)]
    pub dominio: Option<String>,
    #[serde(default)]
    pub estandar_numero: Option<u32>,
    #[serde(rename = "año_vigencia")]
    pub anio_vigencia: i32,
    pub nivel_educativo: String,
    #[serde(default)]
    pub asignatura: Option<String>,
    #[serde(default = "default_modality")]
    pub modalidad: String,
    pub modulo: u32,
    #[serde(default)]
    pub tarea: Option<u32>,
    #[serde(default)]
    pub peso_porcentaje: Option<f64>,
    pub niveles_desempeno: BTreeMap<String, PerformanceLevel>,
    #[serde(default)]
    pub fuente_oficial: Option<String>,
    #[serde(default)]
    pub pagina_manual: Option<u32>,
    #[serde(default)]
    pub notas_aclaratorias: Option<String>,
    #[serde(default)]
    pub ejemplos: Vec<String>,
    #[serde(default = "default_active")]
    pub activo: bool,
    #[serde(default)]
    pub version: Option<String>,
}

fn default_modality() -> String {
    "Regular".to_string()
}

fn default_active() -> bool {
    true
}
