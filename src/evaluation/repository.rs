use async_trait::async_trait;
use tracing::warn;

use super::types::EvaluationResult;
use crate::storage::{StorageError, StorageResult};

/// Append-only store of evaluation results.
#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    /// Stores `result` as the next version of its (artifact, indicator) pair, ignoring
    /// `result.version`, and returns the version assigned.
    async fn save(&self, result: &EvaluationResult) -> StorageResult<u32>;

    /// Every stored version for the pair, oldest first.
    async fn history(
        &self,
        artifact_hash: &str,
        indicator_id: &str,
    ) -> StorageResult<Vec<EvaluationResult>>;
}

/// Saves each result in turn and writes the assigned version back into it. A failed
/// save does not stop the rest; failures are returned with their indicator id.
pub async fn save_all<R>(
    repository: &R,
    results: &mut [EvaluationResult],
) -> Vec<(String, StorageError)>
where
    R: EvaluationRepository + ?Sized,
{
    let mut failures = Vec::new();
    for result in results.iter_mut() {
        match repository.save(result).await {
            Ok(version) => result.version = version,
            Err(e) => {
                warn!(indicator_id = %result.indicator_id, error = %e, "Failed to store evaluation result");
                failures.push((result.indicator_id.clone(), e));
            }
        }
    }
    failures
}
