use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::context::EducationalContext;
use crate::embedding::{CacheEntry, EmbeddingCache, EmbeddingSource, EmbeddingStore, StubEmbedder};
use crate::evaluation::{
    EvaluationConfig, EvaluationEngine, EvaluationRepository, EvaluationResult, MockReasoningModel,
};
use crate::hashing::hash_query;
use crate::rubric::fixtures::{indicator_record, sample_indicator};
use crate::rubric::{IndicatorStatistics, RubricIndicator, RubricQuery, RubricRepository, StatisticsSource};
use crate::telemetry::{QueryWithoutResults, RetrievalMetrics, TelemetrySink};

fn ctx() -> EducationalContext {
    EducationalContext::new("Matemática", "Educación Básica", 2025, "Regular")
}

fn open_temp() -> (TempDir, SqliteStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = SqliteStore::open(dir.path().join("nested").join("rubrica.db")).expect("open store");
    (dir, store)
}

fn indicator(id: &str, subject: Option<&str>, module: u32, active: bool) -> RubricIndicator {
    let mut record = indicator_record();
    record["indicador_id"] = json!(id);
    record["asignatura"] = json!(subject);
    record["modulo"] = json!(module);
    record["activo"] = json!(active);
    serde_json::from_value(record).expect("valid rubric")
}

async fn scoped(store: &SqliteStore, level: &str, subject: &str) -> Vec<RubricIndicator> {
    store
        .indicators(&RubricQuery::new(2025, level, subject, 1))
        .await
        .expect("indicators")
}

async fn evaluated() -> EvaluationResult {
    let answer = json!({
        "nivel_alcanzado": "Básico",
        "puntaje": 2.0,
        "condiciones_evaluadas": [
            {"condicion_id": "B1", "cumple": true, "evidencia_textual": "Objetivo: resolver problemas", "razon": "explícito"},
            {"condicion_id": "B2", "cumple": false, "evidencia_textual": "", "razon": "no aparece"},
            {"condicion_id": "B3", "cumple": false, "evidencia_textual": "", "razon": "no aparece"}
        ],
        "condiciones_cumplidas": 1,
        "condiciones_totales": 3,
        "justificacion": "Objetivo declarado sin vínculo curricular."
    })
    .to_string();
    let engine = EvaluationEngine::new(
        Arc::new(MockReasoningModel::answering(answer)),
        EvaluationConfig::default(),
    );
    engine
        .evaluate_indicator("Objetivo: resolver problemas de proporcionalidad.", &ctx(), &sample_indicator())
        .await
        .expect("evaluation")
}

#[test]
fn test_open_creates_parent_directories() {
    let (dir, store) = open_temp();
    assert!(dir.path().join("nested").join("rubrica.db").exists());
    assert!(store.path().is_some());
}

#[tokio::test]
async fn test_embedding_round_trip_and_touch() {
    let (_dir, store) = open_temp();
    let hash = hash_query("Evaluación formativa");
    let entry = CacheEntry::new(hash.clone(), "Evaluación formativa".to_string(), vec![0.25, -1.5, 3.0]);

    assert!(store.get(&hash).await.unwrap().is_none());
    store.put(&entry).await.unwrap();

    let loaded = store.get(&hash).await.unwrap().expect("stored entry");
    assert_eq!(loaded.embedding, vec![0.25, -1.5, 3.0]);
    assert_eq!(loaded.query_text, "Evaluación formativa");
    assert_eq!(loaded.use_count, 1);

    store.touch(&hash).await.unwrap();
    store.touch(&hash).await.unwrap();
    let touched = store.get(&hash).await.unwrap().expect("stored entry");
    assert_eq!(touched.use_count, 3);
    assert!(touched.last_used_at >= loaded.last_used_at);
}

#[tokio::test]
async fn test_put_replaces_existing_row() {
    let store = SqliteStore::open_in_memory().unwrap();
    let hash = hash_query("retroalimentación");
    store
        .put(&CacheEntry::new(hash.clone(), "retroalimentación".into(), vec![1.0, 0.0]))
        .await
        .unwrap();
    store
        .put(&CacheEntry::new(hash.clone(), "retroalimentación".into(), vec![0.0, 1.0]))
        .await
        .unwrap();

    let loaded = store.get(&hash).await.unwrap().unwrap();
    assert_eq!(loaded.embedding, vec![0.0, 1.0]);
}

#[tokio::test]
async fn test_embeddings_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rubrica.db");
    let embedder = Arc::new(StubEmbedder::new(8));

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let cache = EmbeddingCache::new(embedder.clone(), 10).with_store(store);
        let first = cache.get_or_create("Trabajo colaborativo").await.unwrap();
        assert_eq!(first.source, EmbeddingSource::Computed);
    }

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let cache = EmbeddingCache::new(embedder.clone(), 10).with_store(store);
    let again = cache.get_or_create("trabajo colaborativo").await.unwrap();
    assert_eq!(again.source, EmbeddingSource::Store);
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn test_telemetry_rows_are_persisted() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .record_retrieval(&RetrievalMetrics {
            query: "instrumentos de evaluación".to_string(),
            context: ctx(),
            candidates_count: 24,
            results_count: 8,
            mean_score: 0.8,
            latency_ms: 140,
            reranking_applied: true,
            hybrid_applied: false,
            recorded_at: Utc::now(),
        })
        .await
        .unwrap();
    store
        .record_empty_result(&QueryWithoutResults {
            query: "astrofísica".to_string(),
            context: ctx(),
            similarity_threshold: 0.7,
            recorded_at: Utc::now(),
        })
        .await
        .unwrap();

    let retrievals = store.recent_retrievals(10).await.unwrap();
    assert_eq!(retrievals.len(), 1);
    assert_eq!(retrievals[0].context, ctx());
    assert_eq!(retrievals[0].candidates_count, 24);
    assert!(retrievals[0].reranking_applied);
    assert!((retrievals[0].mean_score - 0.8).abs() < 1e-6);

    let empty = store.recent_empty_queries(10).await.unwrap();
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].query, "astrofísica");
    assert!((empty[0].similarity_threshold - 0.7).abs() < 1e-6);
}

#[tokio::test]
async fn test_rubric_query_filters_and_orders() {
    let store = SqliteStore::open_in_memory().unwrap();
    for ind in [
        indicator("M1T1-I3", Some("Matemática"), 1, true),
        indicator("M1T1-I1", None, 1, true),
        indicator("M1T1-I2", Some("Lenguaje"), 1, true),
        indicator("M1T1-I4", Some("Matemática"), 1, false),
        indicator("M2T1-I1", Some("Matemática"), 2, true),
    ] {
        store.upsert_indicator(&ind).await.unwrap();
    }

    let query = RubricQuery::new(2025, "Educación Básica", "Matemática", 1);
    let ids: Vec<String> = store
        .indicators(&query)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.indicator_id)
        .collect();
    assert_eq!(ids, vec!["M1T1-I1", "M1T1-I3"]);

    let none = store
        .indicators(&RubricQuery::new(2025, "Educación Básica", "Matemática", 1).with_task(2))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_upsert_indicator_replaces_same_scope() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut ind = sample_indicator();
    store.upsert_indicator(&ind).await.unwrap();
    ind.name = "Objetivos de aprendizaje (revisado)".to_string();
    store.upsert_indicator(&ind).await.unwrap();

    let loaded = store
        .indicators(&RubricQuery::new(2025, "Educación Básica", "Matemática", 1))
        .await
        .unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0], ind);
}

#[tokio::test]
async fn test_same_indicator_id_coexists_across_subjects_and_levels() {
    let store = SqliteStore::open_in_memory().unwrap();
    let math = indicator("M1-I1", Some("Matemática"), 1, true);
    let language = indicator("M1-I1", Some("Lenguaje"), 1, true);
    let mut secondary = indicator("M1-I1", Some("Matemática"), 1, true);
    secondary.level = "Educación Media".to_string();
    for ind in [&math, &language, &secondary] {
        store.upsert_indicator(ind).await.unwrap();
    }

    assert_eq!(scoped(&store, "Educación Básica", "Matemática").await, vec![math]);
    assert_eq!(scoped(&store, "Educación Básica", "Lenguaje").await, vec![language]);
    assert_eq!(scoped(&store, "Educación Media", "Matemática").await, vec![secondary]);
}

#[tokio::test]
async fn test_generalist_indicator_is_kept_beside_subject_specific_one() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .upsert_indicator(&indicator("M1-I1", None, 1, true))
        .await
        .unwrap();
    store
        .upsert_indicator(&indicator("M1-I1", Some("Lenguaje"), 1, true))
        .await
        .unwrap();

    let math = store
        .indicators(&RubricQuery::new(2025, "Educación Básica", "Matemática", 1))
        .await
        .unwrap();
    assert_eq!(math.len(), 1);
    assert_eq!(math[0].subject, None);

    let language = store
        .indicators(&RubricQuery::new(2025, "Educación Básica", "Lenguaje", 1))
        .await
        .unwrap();
    assert_eq!(language.len(), 2);
}

#[tokio::test]
async fn test_statistics_lookup() {
    let store = SqliteStore::open_in_memory().unwrap();
    let stats = IndicatorStatistics {
        mean: 2.4,
        std_dev: 0.7,
    };
    store
        .upsert_statistics("M1T1-I1", 2025, "Educación Básica", stats)
        .await
        .unwrap();

    assert_eq!(
        store.statistics("M1T1-I1", 2025, "Educación Básica").await.unwrap(),
        Some(stats)
    );
    assert_eq!(store.statistics("M1T1-I1", 2024, "Educación Básica").await.unwrap(), None);
}

#[tokio::test]
async fn test_evaluation_versions_are_append_only() {
    let (_dir, store) = open_temp();
    let result = evaluated().await;

    assert_eq!(store.save(&result).await.unwrap(), 1);
    let mut rerun = evaluated().await;
    rerun.justification = "Segunda corrida.".to_string();
    assert_eq!(store.save(&rerun).await.unwrap(), 2);

    let history = store
        .history(&result.artifact_hash, &result.indicator_id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, 1);
    assert_eq!(history[0].justification, "Objetivo declarado sin vínculo curricular.");
    assert_eq!(history[1].version, 2);
    assert_eq!(history[1].justification, "Segunda corrida.");
    assert_eq!(history[1].level, result.level);

    assert!(store.history("otro", &result.indicator_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_vector_blob_is_invalid_data() {
    let (dir, store) = open_temp();
    let raw = rusqlite::Connection::open(dir.path().join("nested").join("rubrica.db")).unwrap();
    raw.execute(
        "INSERT INTO cache_embeddings
            (query_hash, query_text, embedding, dimension, created_at, last_used_at, use_count)
         VALUES ('h', 'q', x'010203', 1, '2025-01-01T00:00:00+00:00', '2025-01-01T00:00:00+00:00', 1)",
        [],
    )
    .unwrap();
    drop(raw);

    let err = store.get("h").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidData { .. }));
}
