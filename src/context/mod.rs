//! Educational context used as a filter predicate for passages and rubrics.

use serde::{Deserialize, Serialize};

/// Subject, grade band, applicable year and modality of a query.
///
/// Immutable per query. Every field is matched exactly against passage metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EducationalContext {
    /// Subject (`asignatura`), e.g. `"Matemática"`.
    #[serde(rename = "asignatura")]
    pub subject: String,
    /// Grade band (`nivel_educativo`), e.g. `"Educación Media"`.
    #[serde(rename = "nivel_educativo")]
    pub level: String,
    /// Year the rubric framework applies to (`año_vigencia`).
    #[serde(rename = "año_vigencia")]
    pub year: i32,
    /// Modality (`modalidad`), e.g. `"Regular"`.
    #[serde(rename = "modalidad")]
    pub modality: String,
}

impl EducationalContext {
    pub fn new(
        subject: impl Into<String>,
        level: impl Into<String>,
        year: i32,
        modality: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            level: level.into(),
            year,
            modality: modality.into(),
        }
    }

    /// Returns `true` when passage metadata matches all four fields.
    pub fn matches(&self, subject: &str, level: &str, year: i32, modality: &str) -> bool {
        self.year == year
            && self.subject == subject
            && self.level == level
            && self.modality == modality
    }
}

impl std::fmt::Display for EducationalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / {} / {}",
            self.modality, self.subject, self.level, self.year
        )
    }
}
