//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use rubrica::context::EducationalContext;
use rubrica::embedding::{EmbeddingCache, StubEmbedder};
use rubrica::storage::SqliteStore;
use rubrica::vectordb::{MockPassageStore, Passage, PassagePoint};

pub const DIM: usize = 32;

pub const ARTIFACT: &str = "Objetivo: resolver problemas de proporcionalidad en contextos cotidianos. \
                            Actividades: trabajo en parejas y plenario. Al cierre se evaluará con un ticket de salida.";

pub fn ctx() -> EducationalContext {
    EducationalContext::new("Matemática", "Educación Básica", 2025, "Regular")
}

/// Unit vector whose cosine similarity to `query` is `similarity`.
pub fn vector_at(embedder: &StubEmbedder, query: &[f32], similarity: f32, salt: &str) -> Vec<f32> {
    let random = embedder.vector_for(salt);
    let dot: f32 = random.iter().zip(query).map(|(r, q)| r * q).sum();
    let mut ortho: Vec<f32> = random.iter().zip(query).map(|(r, q)| r - dot * q).collect();
    let norm: f32 = ortho.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in &mut ortho {
        *x /= norm;
    }
    let rest = (1.0 - similarity * similarity).sqrt();
    query
        .iter()
        .zip(&ortho)
        .map(|(q, o)| similarity * q + rest * o)
        .collect()
}

/// Everything a retrieval pipeline needs, backed by a SQLite file in a temp dir.
pub struct Harness {
    pub dir: TempDir,
    pub db: Arc<SqliteStore>,
    pub embedder: Arc<StubEmbedder>,
    pub cache: Arc<EmbeddingCache>,
    pub passages: Arc<MockPassageStore>,
}

impl Harness {
    /// Indexes one passage per `(id, similarity)` in `ctx()`, scored against `query`.
    pub fn new(query: &str, passages: &[(&str, f32)]) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let db = Arc::new(SqliteStore::open(dir.path().join("rubrica.db")).expect("open db"));
        let embedder = Arc::new(StubEmbedder::new(DIM));
        let cache = Arc::new(EmbeddingCache::new(embedder.clone(), 100).with_store(db.clone()));

        let query_vector = embedder.vector_for(query.trim());
        let points = passages
            .iter()
            .map(|(id, similarity)| {
                let passage = Passage::new(*id, format!("Estándar {id}: criterios de evaluación"), &ctx())
                    .with_standard("A", 2);
                PassagePoint::new(vector_at(&embedder, &query_vector, *similarity, id), passage)
            })
            .collect();

        Self {
            dir,
            db,
            embedder,
            cache,
            passages: Arc::new(MockPassageStore::with_points(points)),
        }
    }
}

/// A model answer for indicator `M1T1-I1` claiming `level`.
pub fn answer(level: &str, score: f64, verdicts: &[(&str, bool)], satisfied: usize, total: usize) -> String {
    let conditions: Vec<Value> = verdicts
        .iter()
        .map(|(id, ok)| {
            json!({
                "condicion_id": id,
                "cumple": ok,
                "evidencia_textual": if *ok { format!("cita para {id}") } else { String::new() },
                "razon": "razón"
            })
        })
        .collect();
    json!({
        "nivel_alcanzado": level,
        "puntaje": score,
        "condiciones_evaluadas": conditions,
        "condiciones_cumplidas": satisfied,
        "condiciones_totales": total,
        "justificacion": "Justificación.",
        "recomendaciones": [
            {"prioridad": "alta", "accion": "Vincular con Bases Curriculares", "impacto": "Coherencia"}
        ]
    })
    .to_string()
}
