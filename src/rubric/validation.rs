//! Load-time validation of rubric records.
//!
//! A record becomes a [`RubricIndicator`] only if it has exactly four levels, one per
//! canonical name, each carrying its canonical score, so scores strictly increase
//! from Insatisfactorio to Destacado.

use std::collections::{BTreeMap, HashSet};

use super::error::RubricError;
use super::types::{Level, PerformanceLevel, PerformanceLevels, RubricIndicator, RubricRecord};

impl TryFrom<RubricRecord> for RubricIndicator {
    type Error = RubricError;

    fn try_from(record: RubricRecord) -> Result<Self, Self::Error> {
        let levels = validate_levels(&record.indicador_id, record.niveles_desempeno)?;
        validate_condition_ids(&record.indicador_id, &levels)?;

        Ok(RubricIndicator {
            id: record.id,
            indicator_id: record.indicador_id,
            name: record.nombre_indicador,
            description: record.descripcion_general,
            domain: record.dominio,
            standard_number: record.estandar_numero,
            year: record.anio_vigencia,
            level: record.nivel_educativo,
            subject: record.asignatura,
            modality: record.modalidad,
            module: record.modulo,
            task: record.tarea,
            weight_percent: record.peso_porcentaje,
            levels,
            official_source: record.fuente_oficial,
            manual_page: record.pagina_manual,
            clarifying_notes: record.notas_aclaratorias,
            examples: record.ejemplos,
            active: record.activo,
            version: record.version,
        })
    }
}

/// Validates the raw level map and arranges it into the fixed four-slot structure.
pub fn validate_levels(
    indicator_id: &str,
    raw: BTreeMap<String, PerformanceLevel>,
) -> Result<PerformanceLevels, RubricError> {
    if raw.len() != 4 {
        return Err(RubricError::WrongLevelCount {
            indicator_id: indicator_id.to_string(),
            found: raw.len(),
        });
    }

    let mut seen_scores: Vec<f64> = Vec::with_capacity(4);
    for level in raw.values() {
        if seen_scores
            .iter()
            .any(|s| (s - level.score).abs() < f64::EPSILON)
        {
            return Err(RubricError::DuplicateScore {
                indicator_id: indicator_id.to_string(),
                score: level.score,
            });
        }
        seen_scores.push(level.score);
    }

    let mut slots: [Option<PerformanceLevel>; 4] = [None, None, None, None];
    for (key, level) in raw {
        let key_level =
            Level::from_name(&key).ok_or_else(|| RubricError::UnknownLevel { name: key.clone() })?;

        if key_level != level.level {
            return Err(RubricError::KeyMismatch {
                indicator_id: indicator_id.to_string(),
                key,
                level: level.level.as_str(),
            });
        }

        let expected = level.level.score();
        if (level.score - expected).abs() >= f64::EPSILON {
            return Err(RubricError::ScoreMismatch {
                indicator_id: indicator_id.to_string(),
                level: level.level.as_str(),
                expected,
                found: level.score,
            });
        }

        if level.level != Level::Insatisfactorio && level.conditions.is_empty() {
            return Err(RubricError::EmptyConditions {
                indicator_id: indicator_id.to_string(),
                level: level.level.as_str(),
            });
        }

        let slot = &mut slots[level.level as usize];
        if slot.is_some() {
            return Err(RubricError::DuplicateLevel {
                indicator_id: indicator_id.to_string(),
                level: level.level.as_str(),
            });
        }
        *slot = Some(level);
    }

    match slots {
        [Some(insatisfactorio), Some(basico), Some(competente), Some(destacado)] => {
            Ok(PerformanceLevels {
                insatisfactorio,
                basico,
                competente,
                destacado,
            })
        }
        partial => Err(RubricError::WrongLevelCount {
            indicator_id: indicator_id.to_string(),
            found: partial.iter().filter(|slot| slot.is_some()).count(),
        }),
    }
}

fn validate_condition_ids(
    indicator_id: &str,
    levels: &PerformanceLevels,
) -> Result<(), RubricError> {
    let mut seen = HashSet::new();
    for condition in levels.ascending().flat_map(|l| l.conditions.iter()) {
        if !seen.insert(condition.id.as_str()) {
            return Err(RubricError::DuplicateConditionId {
                indicator_id: indicator_id.to_string(),
                condition_id: condition.id.clone(),
            });
        }
    }
    Ok(())
}

/// Parses a JSON array of rubric records. Each record is validated on its own, so one
/// bad record does not hide the others; only a malformed array fails as a whole.
pub fn parse_records(json: &str) -> Result<Vec<Result<RubricIndicator, RubricError>>, RubricError> {
    let records: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| RubricError::Malformed {
            reason: e.to_string(),
        })?;

    Ok(records
        .into_iter()
        .map(|value| {
            let record: RubricRecord =
                serde_json::from_value(value).map_err(|e| RubricError::Malformed {
                    reason: e.to_string(),
                })?;
            RubricIndicator::try_from(record)
        })
        .collect())
}

/// Checks the strict ordering invariant on an already-built indicator.
pub fn scores_strictly_increase(levels: &PerformanceLevels) -> bool {
    let scores: Vec<f64> = levels.ascending().map(|l| l.score).collect();
    scores.windows(2).all(|w| w[0] < w[1])
}
