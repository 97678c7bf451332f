//! Evaluation request assembly.

use std::fmt::Write;

use crate::rubric::{CombinationLogic, Level, PerformanceLevel, RubricIndicator};

/// System instruction sent with every evaluation.
pub const SYSTEM_PROMPT: &str = "Eres un evaluador experto del Sistema de Reconocimiento Profesional Docente de Chile (MINEDUC). Respondes solo en formato JSON válido.";

const RESPONSE_SCHEMA: &str = r#"{
  "nivel_alcanzado": "Destacado" | "Competente" | "Básico" | "Insatisfactorio",
  "puntaje": 4.0 | 3.0 | 2.0 | 1.0,
  "condiciones_evaluadas": [
    {
      "condicion_id": "id de la condición, tal como aparece entre corchetes",
      "descripcion": "descripción de la condición",
      "cumple": true,
      "evidencia_textual": "cita exacta del contenido",
      "razon": "por qué cumple o no"
    }
  ],
  "condiciones_cumplidas": 2,
  "condiciones_totales": 3,
  "justificacion": "Explicación de 2-3 oraciones",
  "para_siguiente_nivel": "Qué falta para el siguiente nivel",
  "fortalezas": ["fortaleza 1", "fortaleza 2"],
  "recomendaciones": [
    {
      "prioridad": "alta" | "media" | "baja",
      "accion": "acción específica",
      "impacto": "cómo mejorará"
    }
  ],
  "evidencias_destacadas": ["cita 1", "cita 2"]
}"#;

/// Builds the single evaluation prompt: indicator, all four levels with verbatim
/// condition text, retrieved framework context, the artifact, rules and answer schema.
pub fn build_prompt(indicator: &RubricIndicator, artifact: &str, context_block: &str) -> String {
    let mut out = String::with_capacity(artifact.len() + context_block.len() + 4096);

    let _ = write!(
        out,
        "# EVALUACIÓN DE INDICADOR - SISTEMA DOCENTE CHILE\n\n\
         ## CONTEXTO\n\
         Tu tarea es evaluar objetivamente el desempeño de un/a docente según las rúbricas \
         oficiales del Marco para la Buena Enseñanza (MBE).\n\n\
         ## INDICADOR A EVALUAR\n\
         **ID:** {}\n\
         **Nombre:** {}\n\
         **Descripción:** {}\n\n\
         ## NIVELES DE DESEMPEÑO\n\n",
        indicator.indicator_id, indicator.name, indicator.description
    );

    for level in indicator.levels.descending() {
        write_level(&mut out, level);
    }

    if let Some(notes) = indicator
        .clarifying_notes
        .as_deref()
        .filter(|n| !n.trim().is_empty())
    {
        let _ = write!(out, "## NOTAS ACLARATORIAS OFICIALES\n{notes}\n\n");
    }

    let _ = write!(
        out,
        "## MARCO DE REFERENCIA\n{}\n\n\
         ## CONTENIDO DEL/LA DOCENTE A EVALUAR\n```\n{}\n```\n\n",
        context_block.trim_end(),
        artifact.trim()
    );

    out.push_str(
        "## INSTRUCCIONES DE EVALUACIÓN\n\n\
         1. **Lee cuidadosamente** todo el contenido del docente\n\
         2. **Evalúa cada condición** de cada nivel por separado, usando su id\n\
         3. **Determina el nivel** más alto cuyas condiciones se cumplen según su lógica\n\
         4. **Justifica** tu decisión con claridad\n\
         5. **Sugiere mejoras** específicas y accionables\n\n\
         ## REGLAS CRÍTICAS\n\n\
         - **NO seas benévolo**: evalúa con el mismo rigor que los evaluadores oficiales\n\
         - **NO asumas**: si no hay evidencia explícita, la condición NO se cumple\n\
         - **SÉ ESTRICTO** con la lógica AND: deben cumplirse TODAS las condiciones\n\
         - **CITA textualmente**: cada condición cumplida debe tener una cita del contenido\n\
         - `puntaje` es el puntaje del nivel alcanzado\n\
         - `condiciones_cumplidas` y `condiciones_totales` cuentan solo las condiciones del \
         nivel alcanzado\n\n\
         ## RESPONDE SOLO CON ESTE JSON (sin markdown, sin comentarios):\n\n",
    );
    out.push_str(RESPONSE_SCHEMA);
    out.push('\n');
    out
}

fn write_level(out: &mut String, level: &PerformanceLevel) {
    let _ = write!(
        out,
        "### NIVEL {} ({:.1} puntos)\n{}\n\n",
        level.level.as_str().to_uppercase(),
        level.level.score(),
        level.description
    );

    if level.level == Level::Insatisfactorio && level.conditions.is_empty() {
        return;
    }

    let quantifier = match level.logic {
        CombinationLogic::And => "TODAS",
        CombinationLogic::Or => "AL MENOS UNA",
    };
    let _ = writeln!(out, "**Condiciones (deben cumplirse {quantifier}):**");
    for (i, condition) in level.conditions.iter().enumerate() {
        let _ = write!(out, "{}. [{}] {}", i + 1, condition.id, condition.description);
        if condition.evidence_required {
            out.push_str(" (requiere evidencia textual)");
        }
        out.push('\n');
    }
    if let Some(notes) = level.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        let _ = write!(out, "\n**Notas:** {notes}\n");
    }
    out.push('\n');
}
