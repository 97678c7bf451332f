//! Decoding of the model's answer into its wire shape.
//!
//! Tolerates markdown fences, `//` comments and prose around the JSON object. Anything
//! else that does not decode is a parse failure; nothing is defaulted into a score.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::types::Recommendation;

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*//.*$").expect("valid regex"));
static TRAILING_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)([,\[{])\s*//[^"\n]*$"#).expect("valid regex"));
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?\s*").expect("valid regex"));

/// One condition verdict as the model reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelCondition {
    pub condicion_id: String,
    #[serde(default)]
    pub descripcion: String,
    pub cumple: bool,
    #[serde(default)]
    pub evidencia_textual: String,
    #[serde(default)]
    pub razon: String,
}

/// The model's answer before validation against the rubric.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelEvaluation {
    pub nivel_alcanzado: String,
    pub puntaje: f64,
    pub condiciones_evaluadas: Vec<ModelCondition>,
    #[serde(default)]
    pub condiciones_cumplidas: Option<usize>,
    #[serde(default)]
    pub condiciones_totales: Option<usize>,
    #[serde(default)]
    pub justificacion: String,
    #[serde(default)]
    pub para_siguiente_nivel: Option<String>,
    #[serde(default)]
    pub fortalezas: Vec<String>,
    #[serde(default)]
    pub recomendaciones: Vec<Recommendation>,
    #[serde(default)]
    pub evidencias_destacadas: Vec<String>,
}

/// Extracts and decodes the JSON object in `content`. The error is a human-readable reason.
pub fn parse_response(content: &str) -> Result<ModelEvaluation, String> {
    let cleaned = FENCE.replace_all(content.trim(), "");
    let cleaned = LINE_COMMENT.replace_all(&cleaned, "");
    let cleaned = TRAILING_COMMENT.replace_all(&cleaned, "$1");

    let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) else {
        return Err("no JSON object found in the answer".to_string());
    };
    if end < start {
        return Err("no JSON object found in the answer".to_string());
    }

    serde_json::from_str(&cleaned[start..=end]).map_err(|e| format!("invalid evaluation JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = r#"{
        "nivel_alcanzado": "Competente",
        "puntaje": 3.0,
        "condiciones_evaluadas": [
            {"condicion_id": "C1", "cumple": true, "evidencia_textual": "cita", "razon": "ok"}
        ],
        "condiciones_cumplidas": 1,
        "condiciones_totales": 3,
        "justificacion": "texto"
    }"#;

    #[test]
    fn test_parses_plain_json() {
        let parsed = parse_response(ANSWER).expect("parse");
        assert_eq!(parsed.nivel_alcanzado, "Competente");
        assert_eq!(parsed.puntaje, 3.0);
        assert_eq!(parsed.condiciones_evaluadas.len(), 1);
        assert_eq!(parsed.condiciones_totales, Some(3));
        assert!(parsed.recomendaciones.is_empty());
    }

    #[test]
    fn test_strips_fences_prose_and_comments() {
        let wrapped = format!(
            "Aquí está la evaluación:\n```json\n{}\n```\nSaludos.",
            ANSWER.replace(
                "\"puntaje\": 3.0,",
                "\"puntaje\": 3.0, // nivel competente\n        // comentario suelto"
            )
        );
        let parsed = parse_response(&wrapped).expect("parse");
        assert_eq!(parsed.puntaje, 3.0);
    }

    #[test]
    fn test_keeps_urls_inside_strings() {
        let answer = ANSWER.replace("\"texto\"", "\"ver https://www.docentemas.cl/manual\"");
        let parsed = parse_response(&answer).expect("parse");
        assert_eq!(parsed.justificacion, "ver https://www.docentemas.cl/manual");
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(parse_response("No puedo evaluar este contenido.").is_err());
        assert!(parse_response("} al revés {").is_err());
    }

    #[test]
    fn test_rejects_missing_required_fields() {
        let err = parse_response(r#"{"nivel_alcanzado": "Básico", "puntaje": 2.0}"#).unwrap_err();
        assert!(err.contains("condiciones_evaluadas"));
    }

    #[test]
    fn test_parses_recommendation_priorities() {
        let answer = ANSWER.replace(
            "\"justificacion\": \"texto\"",
            r#""justificacion": "texto", "recomendaciones": [{"prioridad": "Alta", "accion": "a", "impacto": "b"}]"#,
        );
        let parsed = parse_response(&answer).expect("parse");
        assert_eq!(parsed.recomendaciones[0].priority, crate::evaluation::Priority::Alta);
    }
}
