//! Non-blocking telemetry side channel.
//!
//! [`TelemetryRecorder::record`] never waits: records go into a bounded queue drained by
//! one background task. A full queue drops the record with a warning.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::TelemetryConfig;
use super::types::{QueryWithoutResults, RetrievalMetrics, TelemetryRecord};
use crate::storage::StorageResult;

/// Destination for telemetry records.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record_retrieval(&self, metrics: &RetrievalMetrics) -> StorageResult<()>;

    async fn record_empty_result(&self, query: &QueryWithoutResults) -> StorageResult<()>;
}

enum Message {
    Record(TelemetryRecord),
    Flush(oneshot::Sender<()>),
}

/// Cheap-to-clone handle to the telemetry queue.
#[derive(Clone)]
pub struct TelemetryRecorder {
    tx: Option<mpsc::Sender<Message>>,
}

impl std::fmt::Debug for TelemetryRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryRecorder")
            .field("enabled", &self.tx.is_some())
            .finish()
    }
}

impl TelemetryRecorder {
    /// Spawns the writer task. Must be called inside a Tokio runtime.
    pub fn spawn(sink: Arc<dyn TelemetrySink>, config: &TelemetryConfig) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Message>(config.queue_capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Record(TelemetryRecord::Retrieval(metrics)) => {
                        if let Err(e) = sink.record_retrieval(&metrics).await {
                            warn!(error = %e, "Failed to persist retrieval metrics");
                        }
                    }
                    Message::Record(TelemetryRecord::EmptyResult(query)) => {
                        if let Err(e) = sink.record_empty_result(&query).await {
                            warn!(error = %e, "Failed to persist query without results");
                        }
                    }
                    Message::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            debug!("Telemetry writer stopped");
        });

        (Self { tx: Some(tx) }, handle)
    }

    /// A recorder that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queues a record without waiting. Returns `false` if it was dropped.
    pub fn record(&self, record: TelemetryRecord) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(Message::Record(record)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Telemetry queue full; dropping record");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Telemetry writer stopped; dropping record");
                false
            }
        }
    }

    /// Waits until every record queued before this call has been handed to the sink.
    pub async fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if tx.send(Message::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[cfg(any(test, feature = "mock"))]
pub use memory_sink::MemoryTelemetrySink;

#[cfg(any(test, feature = "mock"))]
mod memory_sink {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::TelemetrySink;
    use crate::storage::{StorageError, StorageResult};
    use crate::telemetry::types::{QueryWithoutResults, RetrievalMetrics};

    /// Collects records in memory.
    #[derive(Debug, Default)]
    pub struct MemoryTelemetrySink {
        retrievals: Mutex<Vec<RetrievalMetrics>>,
        empty_results: Mutex<Vec<QueryWithoutResults>>,
        fail: AtomicBool,
    }

    impl MemoryTelemetrySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn retrievals(&self) -> Vec<RetrievalMetrics> {
            self.retrievals.lock().clone()
        }

        pub fn empty_results(&self) -> Vec<QueryWithoutResults> {
            self.empty_results.lock().clone()
        }

        fn check(&self) -> StorageResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable {
                    reason: "memory sink set to fail".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TelemetrySink for MemoryTelemetrySink {
        async fn record_retrieval(&self, metrics: &RetrievalMetrics) -> StorageResult<()> {
            self.check()?;
            self.retrievals.lock().push(metrics.clone());
            Ok(())
        }

        async fn record_empty_result(&self, query: &QueryWithoutResults) -> StorageResult<()> {
            self.check()?;
            self.empty_results.lock().push(query.clone());
            Ok(())
        }
    }
}
