use std::sync::Arc;

use chrono::Utc;

use super::*;
use crate::context::EducationalContext;

fn ctx() -> EducationalContext {
    EducationalContext::new("Historia", "Educación Media", 2025, "Regular")
}

fn metrics(query: &str) -> TelemetryRecord {
    TelemetryRecord::Retrieval(RetrievalMetrics {
        query: query.to_string(),
        context: ctx(),
        candidates_count: 24,
        results_count: 8,
        mean_score: 0.81,
        latency_ms: 120,
        reranking_applied: true,
        hybrid_applied: false,
        recorded_at: Utc::now(),
    })
}

fn empty(query: &str) -> TelemetryRecord {
    TelemetryRecord::EmptyResult(QueryWithoutResults {
        query: query.to_string(),
        context: ctx(),
        similarity_threshold: 0.7,
        recorded_at: Utc::now(),
    })
}

#[tokio::test]
async fn test_records_reach_sink_after_flush() {
    let sink = Arc::new(MemoryTelemetrySink::new());
    let (recorder, _handle) = TelemetryRecorder::spawn(sink.clone(), &TelemetryConfig::default());

    assert!(recorder.record(metrics("fuentes históricas")));
    assert!(recorder.record(empty("tema sin cobertura")));
    recorder.flush().await;

    let retrievals = sink.retrievals();
    assert_eq!(retrievals.len(), 1);
    assert_eq!(retrievals[0].query, "fuentes históricas");
    assert!(retrievals[0].reranking_applied);

    let empties = sink.empty_results();
    assert_eq!(empties.len(), 1);
    assert_eq!(empties[0].query, "tema sin cobertura");
}

#[tokio::test]
async fn test_full_queue_drops_without_blocking() {
    let sink = Arc::new(MemoryTelemetrySink::new());
    let config = TelemetryConfig::default().with_queue_capacity(1);
    let (recorder, _handle) = TelemetryRecorder::spawn(sink.clone(), &config);

    // The writer has not run yet on this single-threaded runtime.
    assert!(recorder.record(metrics("uno")));
    assert!(!recorder.record(metrics("dos")));

    recorder.flush().await;
    assert_eq!(sink.retrievals().len(), 1);
}

#[tokio::test]
async fn test_sink_failure_keeps_writer_alive() {
    let sink = Arc::new(MemoryTelemetrySink::new());
    let (recorder, _handle) = TelemetryRecorder::spawn(sink.clone(), &TelemetryConfig::default());

    sink.set_fail(true);
    recorder.record(metrics("perdida"));
    recorder.flush().await;

    sink.set_fail(false);
    recorder.record(metrics("guardada"));
    recorder.flush().await;

    let retrievals = sink.retrievals();
    assert_eq!(retrievals.len(), 1);
    assert_eq!(retrievals[0].query, "guardada");
}

#[tokio::test]
async fn test_disabled_recorder_discards() {
    let recorder = TelemetryRecorder::disabled();
    assert!(!recorder.is_enabled());
    assert!(!recorder.record(metrics("nada")));
    recorder.flush().await;
}

#[tokio::test]
async fn test_writer_stops_when_handles_dropped() {
    let sink = Arc::new(MemoryTelemetrySink::new());
    let (recorder, handle) = TelemetryRecorder::spawn(sink, &TelemetryConfig::default());
    drop(recorder);
    handle.await.unwrap();
}

#[test]
fn test_zero_queue_rejected() {
    assert!(TelemetryConfig::default().validate().is_ok());
    assert!(
        TelemetryConfig::default()
            .with_queue_capacity(0)
            .validate()
            .is_err()
    );
}
