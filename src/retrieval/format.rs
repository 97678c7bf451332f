//! Renders ranked passages into the context block injected into evaluation prompts.

use std::fmt::Write;

use super::types::RankedResult;
use crate::context::EducationalContext;

const SEPARATOR: &str = "\n\n---\n\n";

/// Deterministic rendering: a context header, then one numbered section per result.
pub fn format_for_reasoning(results: &[RankedResult], context: &EducationalContext) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "## CONTEXTO DEL MARCO PARA LA BUENA ENSEÑANZA {}\n\n\
         ### INFORMACIÓN DEL PORTAFOLIO\n\
         - Modalidad: {}\n\
         - Asignatura: {}\n\
         - Nivel: {}{SEPARATOR}",
        context.year, context.modality, context.subject, context.level
    );

    for (i, result) in results.iter().enumerate() {
        let _ = write!(out, "### Referencia {}", i + 1);
        let metadata = result.metadata();
        if let (Some(domain), Some(standard)) = (&metadata.domain, metadata.standard_number) {
            let _ = write!(out, " - Dominio {domain}, Estándar {standard}");
        }
        let _ = write!(
            out,
            " (Relevancia: {:.1}%)\n\n{}{SEPARATOR}",
            result.score_final * 100.0,
            result.content()
        );
    }

    out
}

/// Sentence used in place of the context block when nothing matched.
pub fn no_context_message(year: i32) -> String {
    format!("No se encontró contexto específico del MBE {year} para esta consulta.")
}
