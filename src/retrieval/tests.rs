use std::sync::Arc;

use super::*;
use crate::context::EducationalContext;
use crate::embedding::{EmbeddingCache, StubEmbedder};
use crate::reranker::MockReranker;
use crate::telemetry::{MemoryTelemetrySink, TelemetryConfig, TelemetryRecorder};
use crate::vectordb::{MockPassageStore, Passage, PassagePoint};

const DIM: usize = 64;
const QUERY: &str = "retroalimentación formativa en matemática";

fn ctx() -> EducationalContext {
    EducationalContext::new("Matemática", "Educación Básica", 2025, "Regular")
}

fn other_ctx() -> EducationalContext {
    EducationalContext::new("Historia", "Educación Media", 2025, "Regular")
}

/// Unit vector whose cosine similarity to `query` is `similarity`.
fn vector_at(embedder: &StubEmbedder, query: &[f32], similarity: f32, salt: &str) -> Vec<f32> {
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

struct Fixture {
    embedder: Arc<StubEmbedder>,
    store: Arc<MockPassageStore>,
    cache: Arc<EmbeddingCache>,
}

impl Fixture {
    /// Passages in `ctx()` with the given similarities to `QUERY`, ids `p0`, `p1`, ...
    fn new(similarities: &[f32]) -> Self {
        let embedder = Arc::new(StubEmbedder::new(DIM));
        let query = embedder.vector_for(QUERY);
        let points = similarities
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let passage = Passage::new(
                    format!("p{i}"),
                    format!("Pasaje {i} sobre retroalimentación formativa"),
                    &ctx(),
                )
                .with_standard("B", i as u32 + 1);
                PassagePoint::new(vector_at(&embedder, &query, s, &format!("salt-{i}")), passage)
            })
            .collect();
        let store = Arc::new(MockPassageStore::with_points(points));
        let cache = Arc::new(EmbeddingCache::new(embedder.clone(), 100));
        Self {
            embedder,
            store,
            cache,
        }
    }

    fn retriever(&self) -> ContextRetriever<MockPassageStore> {
        ContextRetriever::new(self.cache.clone(), self.store.clone(), RetrieverConfig::default())
    }
}

fn ids(results: &[RankedResult]) -> Vec<&str> {
    results
        .iter()
        .map(|r| r.metadata().passage_id.as_str())
        .collect()
}

#[tokio::test]
async fn test_no_match_returns_empty_and_records_telemetry() {
    let fixture = Fixture::new(&[0.95, 0.9]);
    let sink = Arc::new(MemoryTelemetrySink::new());
    let (telemetry, _handle) = TelemetryRecorder::spawn(sink.clone(), &TelemetryConfig::default());
    let retriever = fixture.retriever().with_telemetry(telemetry.clone());

    let results = retriever
        .retrieve_context(QUERY, &other_ctx(), RetrievalOptions::default())
        .await
        .expect("empty result is not an error");
    assert!(results.is_empty());

    telemetry.flush().await;
    let retrievals = sink.retrievals();
    assert_eq!(retrievals.len(), 1);
    assert_eq!(retrievals[0].results_count, 0);
    assert_eq!(retrievals[0].candidates_count, 0);
    assert_eq!(retrievals[0].mean_score, 0.0);

    let empties = sink.empty_results();
    assert_eq!(empties.len(), 1);
    assert_eq!(empties[0].query, QUERY);
    assert_eq!(empties[0].context, other_ctx());
    assert!((empties[0].similarity_threshold - 0.70).abs() < 1e-6);
}

#[tokio::test]
async fn test_results_are_ordered_and_thresholded() {
    let fixture = Fixture::new(&[0.75, 0.95, 0.5, 0.85]);
    let retriever = fixture.retriever();

    let results = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default())
        .await
        .expect("retrieve");

    assert_eq!(ids(&results), vec!["p1", "p3", "p0"]);
    for pair in results.windows(2) {
        assert!(pair[0].score_final >= pair[1].score_final);
    }
    assert!(results.iter().all(|r| r.candidate.rerank_score.is_none()));
    assert!(results.iter().all(|r| r.score_final == r.candidate.similarity));
}

#[tokio::test]
async fn test_explicit_threshold_overrides_default() {
    let fixture = Fixture::new(&[0.75, 0.95, 0.5, 0.85]);
    let retriever = fixture.retriever();

    let results = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_threshold(0.9))
        .await
        .expect("retrieve");
    assert_eq!(ids(&results), vec!["p1"]);
}

#[tokio::test]
async fn test_repeated_query_embeds_once() {
    let fixture = Fixture::new(&[0.9]);
    let retriever = fixture.retriever();

    retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default())
        .await
        .expect("first");
    let second = retriever
        .retrieve_context(&format!("  {}  ", QUERY.to_uppercase()), &ctx(), RetrievalOptions::default())
        .await
        .expect("second");

    assert_eq!(fixture.embedder.calls(), 1);
    assert_eq!(ids(&second), vec!["p0"]);
}

#[tokio::test]
async fn test_rerank_reorders_overfetched_pool() {
    let fixture = Fixture::new(&[0.95, 0.9, 0.85, 0.8, 0.78, 0.76]);
    let reranker = Arc::new(MockReranker::with_scores(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.9]));
    let retriever = fixture.retriever().with_reranker(reranker.clone());

    let results = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_count(2))
        .await
        .expect("retrieve");

    assert_eq!(fixture.store.last_limit(), 6);
    assert_eq!(reranker.calls(), 1);
    assert_eq!(reranker.last_pool(), 6);
    assert_eq!(ids(&results), vec!["p5", "p4"]);
    assert_eq!(results[0].candidate.rerank_score, Some(0.9));
    assert!((results[0].score_final - 0.9).abs() < 1e-6);
    assert!(results[0].candidate.similarity < 0.8);
}

#[tokio::test]
async fn test_reranker_failure_keeps_similarity_order() {
    let fixture = Fixture::new(&[0.8, 0.95, 0.9, 0.85, 0.75]);
    let reranker = Arc::new(MockReranker::new());
    reranker.set_fail(true);
    let sink = Arc::new(MemoryTelemetrySink::new());
    let (telemetry, _handle) = TelemetryRecorder::spawn(sink.clone(), &TelemetryConfig::default());
    let retriever = fixture
        .retriever()
        .with_reranker(reranker.clone())
        .with_telemetry(telemetry.clone());

    let results = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_count(3))
        .await
        .expect("rerank failure must not fail retrieval");

    assert_eq!(reranker.calls(), 1);
    assert_eq!(ids(&results), vec!["p1", "p2", "p3"]);
    assert!(results.iter().all(|r| r.candidate.rerank_score.is_none()));

    telemetry.flush().await;
    let retrievals = sink.retrievals();
    assert_eq!(retrievals.len(), 1);
    assert!(!retrievals[0].reranking_applied);
    assert_eq!(retrievals[0].candidates_count, 5);
    assert_eq!(retrievals[0].results_count, 3);
}

#[tokio::test]
async fn test_small_pool_skips_reranking() {
    let fixture = Fixture::new(&[0.95, 0.9, 0.85, 0.8]);
    let reranker = Arc::new(MockReranker::new());
    let retriever = fixture.retriever().with_reranker(reranker.clone());

    // Pool of 3 is not larger than the minimum.
    let results = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_count(1))
        .await
        .expect("retrieve");

    assert_eq!(fixture.store.last_limit(), 3);
    assert_eq!(reranker.calls(), 0);
    assert_eq!(ids(&results), vec!["p0"]);
}

#[tokio::test]
async fn test_pool_size_without_reranker_is_requested_count() {
    let fixture = Fixture::new(&[0.95, 0.9, 0.85, 0.8, 0.78, 0.76, 0.74]);
    let retriever = fixture.retriever();

    for count in [1, 3, 5, 10] {
        let results = retriever
            .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_count(count))
            .await
            .expect("retrieve");
        assert_eq!(fixture.store.last_limit(), count);
        assert!(results.len() <= count);
    }
}

#[tokio::test]
async fn test_pool_never_smaller_than_requested() {
    let fixture = Fixture::new(&[0.95, 0.9, 0.85, 0.8, 0.78, 0.76, 0.74]);
    let retriever = fixture
        .retriever()
        .with_reranker(Arc::new(MockReranker::new()));

    for count in [1, 2, 4, 8] {
        let results = retriever
            .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_count(count))
            .await
            .expect("retrieve");
        assert!(fixture.store.last_limit() >= count);
        assert!(results.len() <= count);
    }
}

#[tokio::test]
async fn test_hybrid_failure_falls_back_to_vector_search() {
    let fixture = Fixture::new(&[0.95, 0.9]);
    fixture.store.set_fail_hybrid(true);
    let sink = Arc::new(MemoryTelemetrySink::new());
    let (telemetry, _handle) = TelemetryRecorder::spawn(sink.clone(), &TelemetryConfig::default());
    let retriever = fixture.retriever().with_telemetry(telemetry.clone());

    let results = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_hybrid(true))
        .await
        .expect("hybrid failure must not fail retrieval");

    assert_eq!(fixture.store.hybrid_calls(), 1);
    assert_eq!(fixture.store.search_calls(), 1);
    assert_eq!(ids(&results), vec!["p0", "p1"]);

    telemetry.flush().await;
    assert!(!sink.retrievals()[0].hybrid_applied);
}

#[tokio::test]
async fn test_hybrid_search_uses_blended_scores() {
    let fixture = Fixture::new(&[0.9, 0.8]);
    let retriever = fixture.retriever();

    let results = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_hybrid(true))
        .await
        .expect("retrieve");

    assert_eq!(fixture.store.hybrid_calls(), 1);
    assert_eq!(fixture.store.search_calls(), 0);
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.score_final >= 0.65));
}

#[tokio::test]
async fn test_vector_search_failure_is_fatal() {
    let fixture = Fixture::new(&[0.9]);
    fixture.store.set_fail_search(true);
    let retriever = fixture.retriever();

    let err = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::VectorSearch(_)));
}

#[tokio::test]
async fn test_embedding_failure_is_fatal() {
    let fixture = Fixture::new(&[0.9]);
    fixture.embedder.set_fail(true);
    let retriever = fixture.retriever();

    let err = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Embedding(_)));
    assert_eq!(fixture.store.search_calls(), 0);
}

#[tokio::test]
async fn test_invalid_options_rejected() {
    let fixture = Fixture::new(&[0.9]);
    let retriever = fixture.retriever();

    let err = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_count(0))
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::InvalidOptions { .. }));

    let err = retriever
        .retrieve_context(QUERY, &ctx(), RetrievalOptions::default().with_threshold(1.5))
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::InvalidOptions { .. }));
    assert_eq!(fixture.embedder.calls(), 0);
}

#[tokio::test]
async fn test_formatted_context() {
    let fixture = Fixture::new(&[0.95, 0.85]);
    let retriever = fixture.retriever();

    let text = retriever
        .retrieve_formatted(QUERY, &ctx(), RetrievalOptions::default())
        .await
        .expect("retrieve");

    assert!(text.starts_with("## CONTEXTO DEL MARCO PARA LA BUENA ENSEÑANZA 2025"));
    assert!(text.contains("- Modalidad: Regular"));
    assert!(text.contains("- Asignatura: Matemática"));
    assert!(text.contains("### Referencia 1 - Dominio B, Estándar 1 (Relevancia: 95.0%)"));
    assert!(text.contains("### Referencia 2 - Dominio B, Estándar 2"));
    assert!(!text.contains("### Referencia 3"));

    let empty = retriever
        .retrieve_formatted(QUERY, &other_ctx(), RetrievalOptions::default())
        .await
        .expect("retrieve");
    assert_eq!(empty, no_context_message(2025));
}

#[tokio::test]
async fn test_context_source_uses_default_count() {
    let fixture = Fixture::new(&[0.95]);
    let retriever = fixture.retriever();
    let source: &dyn ContextSource = &retriever;

    let text = source.context_for(QUERY, &ctx()).await.expect("context");
    assert!(text.contains("### Referencia 1"));
    assert_eq!(fixture.store.last_limit(), 8);
}

#[test]
fn test_formatter_omits_missing_standard() {
    let result = RankedResult::from_similarity(RetrievalCandidate {
        content: "Texto del estándar".to_string(),
        similarity: 0.734,
        rerank_score: None,
        metadata: PassageMetadata {
            passage_id: "x".to_string(),
            content_type: "rubrica".to_string(),
            domain: None,
            standard_number: None,
            subject: "Matemática".to_string(),
            level: "Educación Básica".to_string(),
        },
    });

    let text = format_for_reasoning(&[result], &ctx());
    assert!(text.contains("### Referencia 1 (Relevancia: 73.4%)\n\nTexto del estándar"));
}

#[test]
fn test_config_validation() {
    assert!(RetrieverConfig::default().validate().is_ok());
    assert!(
        RetrieverConfig::default()
            .with_vector_threshold(1.2)
            .validate()
            .is_err()
    );
    assert!(
        RetrieverConfig::default()
            .with_hybrid_vector_weight(-0.1)
            .validate()
            .is_err()
    );
}
