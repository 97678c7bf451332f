use super::*;

fn docs(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

#[test]
fn test_config_defaults_disabled() {
    let config = RerankerConfig::default();
    assert!(!config.is_enabled());
    assert_eq!(config.model, "rerank-multilingual-v3.0");
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_config_skips_without_key() {
    let none = HttpReranker::from_config(&RerankerConfig::default()).unwrap();
    assert!(none.is_none());

    let some = HttpReranker::from_config(&RerankerConfig::default().with_api_key("co-key")).unwrap();
    assert!(some.is_some());
}

#[test]
fn test_config_debug_redacts_key() {
    let rendered = format!("{:?}", RerankerConfig::default().with_api_key("co-secret"));
    assert!(!rendered.contains("co-secret"));
}

#[test]
fn test_invalid_config_rejected() {
    let err = HttpReranker::new(RerankerConfig::default().with_url(" ")).unwrap_err();
    assert!(matches!(err, RerankerError::InvalidConfig { .. }));
}

#[test]
fn test_response_parses_cohere_shape() {
    let body = r#"{"id":"x","results":[{"index":2,"relevance_score":0.91},{"index":0,"relevance_score":0.12}],"meta":{}}"#;
    let parsed: RerankResponse = serde_json::from_str(body).unwrap();
    assert_eq!(parsed.results.len(), 2);
    assert_eq!(parsed.results[0].index, 2);
    assert!((parsed.results[0].relevance - 0.91).abs() < 1e-6);
}

#[test]
fn test_request_serializes_without_documents_echo() {
    let documents = docs(&["a", "b"]);
    let body = RerankRequest {
        model: "rerank-multilingual-v3.0",
        query: "q",
        documents: &documents,
        top_n: 2,
        return_documents: false,
    };
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(value["return_documents"], false);
    assert_eq!(value["documents"][1], "b");
    assert_eq!(value["top_n"], 2);
}

#[test]
fn test_check_indices() {
    let hits = [
        RerankHit {
            index: 0,
            relevance: 0.5,
        },
        RerankHit {
            index: 3,
            relevance: 0.4,
        },
    ];
    assert!(check_indices(&hits, 4).is_ok());
    assert!(matches!(
        check_indices(&hits, 3),
        Err(RerankerError::InvalidIndex { index: 3, len: 3 })
    ));
}

#[tokio::test]
async fn test_mock_orders_by_fixed_scores() {
    let reranker = MockReranker::with_scores(vec![0.1, 0.9, 0.5]);
    let hits = reranker
        .rerank("q", &docs(&["a", "b", "c"]), 2)
        .await
        .unwrap();

    let order: Vec<usize> = hits.iter().map(|h| h.index).collect();
    assert_eq!(order, [1, 2]);
    assert_eq!(reranker.last_pool(), 3);
}

#[tokio::test]
async fn test_mock_lexical_scoring() {
    let reranker = MockReranker::new();
    let hits = reranker
        .rerank(
            "retroalimentación formativa",
            &docs(&["normas de convivencia", "retroalimentación formativa oportuna"]),
            2,
        )
        .await
        .unwrap();

    assert_eq!(hits[0].index, 1);
}

#[tokio::test]
async fn test_mock_failure_and_bad_index() {
    let reranker = MockReranker::new();
    reranker.set_fail(true);
    assert!(reranker.rerank("q", &docs(&["a"]), 1).await.is_err());

    let reranker = MockReranker::with_scores(vec![0.1, 0.9]);
    let err = reranker.rerank("q", &docs(&["a"]), 1).await.unwrap_err();
    assert!(matches!(err, RerankerError::InvalidIndex { index: 1, len: 1 }));
}
