use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::hashing::hash_query;

const DIM: usize = 16;

fn cache_with_store() -> (Arc<StubEmbedder>, Arc<MemoryEmbeddingStore>, EmbeddingCache) {
    let embedder = Arc::new(StubEmbedder::new(DIM));
    let store = Arc::new(MemoryEmbeddingStore::new());
    let cache = EmbeddingCache::new(embedder.clone(), 100).with_store(store.clone());
    (embedder, store, cache)
}

async fn wait_for_touches(store: &MemoryEmbeddingStore, expected: usize) {
    for _ in 0..50 {
        if store.touches() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[test]
fn test_stub_embedder_is_deterministic_and_normalized() {
    let embedder = StubEmbedder::new(DIM);
    let a = embedder.vector_for("planificación");
    let b = embedder.vector_for("planificación");
    let c = embedder.vector_for("evaluación");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), DIM);
    let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_second_call_served_from_cache() {
    let (embedder, _store, cache) = cache_with_store();

    let first = cache.get_or_create("¿Cómo se evalúa la retroalimentación?").await.unwrap();
    let second = cache.get_or_create("¿Cómo se evalúa la retroalimentación?").await.unwrap();

    assert_eq!(first.source, EmbeddingSource::Computed);
    assert_eq!(second.source, EmbeddingSource::Memory);
    assert_eq!(first.query_hash, second.query_hash);
    assert_eq!(first.vector, second.vector);
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn test_normalized_queries_share_an_entry() {
    let (embedder, store, cache) = cache_with_store();

    cache.get_or_create("Evaluación Formativa").await.unwrap();
    let again = cache.get_or_create("  evaluación formativa ").await.unwrap();

    assert!(again.is_hit());
    assert_eq!(embedder.calls(), 1);
    assert_eq!(store.len(), 1);
    assert_eq!(again.query_hash, hash_query("evaluación formativa"));
}

#[tokio::test]
async fn test_store_tier_survives_memory_clear() {
    let (embedder, store, cache) = cache_with_store();

    let first = cache.get_or_create("objetivos de aprendizaje").await.unwrap();
    cache.clear_memory();
    let second = cache.get_or_create("objetivos de aprendizaje").await.unwrap();

    assert_eq!(second.source, EmbeddingSource::Store);
    assert_eq!(first.vector, second.vector);
    assert_eq!(embedder.calls(), 1);

    wait_for_touches(&store, 1).await;
    let row = store.entry(&first.query_hash).unwrap();
    assert_eq!(row.use_count, 2);
    assert_eq!(row.query_text, "objetivos de aprendizaje");
}

#[tokio::test]
async fn test_store_write_failure_still_returns_embedding() {
    let (embedder, store, cache) = cache_with_store();
    store.set_fail_writes(true);

    let result = cache.get_or_create("reflexión pedagógica").await.unwrap();

    assert_eq!(result.source, EmbeddingSource::Computed);
    assert_eq!(result.vector.len(), DIM);
    assert_eq!(embedder.calls(), 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_store_read_failure_falls_through_to_embedder() {
    let (embedder, store, cache) = cache_with_store();
    store.set_fail_reads(true);

    let result = cache.get_or_create("clima de aula").await.unwrap();

    assert_eq!(result.source, EmbeddingSource::Computed);
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn test_wrong_dimension_row_is_recomputed() {
    let (embedder, store, cache) = cache_with_store();
    let hash = hash_query("trabajo colaborativo");
    store
        .put(&CacheEntry::new(
            hash.clone(),
            "trabajo colaborativo".to_string(),
            vec![0.5; DIM + 1],
        ))
        .await
        .unwrap();

    let result = cache.get_or_create("trabajo colaborativo").await.unwrap();

    assert_eq!(result.source, EmbeddingSource::Computed);
    assert_eq!(result.vector.len(), DIM);
    assert_eq!(embedder.calls(), 1);
    assert_eq!(store.entry(&hash).unwrap().embedding.len(), DIM);
}

#[tokio::test]
async fn test_embedder_failure_propagates() {
    let (embedder, _store, cache) = cache_with_store();
    embedder.set_fail(true);

    let err = cache.get_or_create("uso del tiempo").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::RequestFailed { .. }));
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let (embedder, _store, cache) = cache_with_store();

    let err = cache.get_or_create("   ").await.unwrap_err();
    assert!(matches!(err, EmbeddingError::EmptyInput));
    assert_eq!(embedder.calls(), 0);
}

#[test]
fn test_embedding_config_validation() {
    assert!(EmbeddingConfig::default().validate().is_ok());
    assert!(
        EmbeddingConfig::default()
            .with_dimensions(0)
            .validate()
            .is_err()
    );
    assert!(EmbeddingConfig::default().with_url("").validate().is_err());
}

#[test]
fn test_embedding_config_debug_redacts_key() {
    let config = EmbeddingConfig::default().with_api_key("sk-secret");
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("sk-secret"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn test_http_embedder_rejects_invalid_config() {
    let err = HttpEmbedder::new(EmbeddingConfig::default().with_model(" ")).unwrap_err();
    assert!(matches!(err, EmbeddingError::InvalidConfig { .. }));
}
