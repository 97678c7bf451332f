use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::stats::IndicatorStatistics;
use super::types::RubricIndicator;
use crate::storage::StorageResult;

/// Selects the indicators that apply to one portfolio module (and optionally one task).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricQuery {
    pub year: i32,
    pub level: String,
    pub subject: String,
    pub module: u32,
    pub task: Option<u32>,
}

impl RubricQuery {
    pub fn new(year: i32, level: impl Into<String>, subject: impl Into<String>, module: u32) -> Self {
        Self {
            year,
            level: level.into(),
            subject: subject.into(),
            module,
            task: None,
        }
    }

    pub fn with_task(mut self, task: u32) -> Self {
        self.task = Some(task);
        self
    }

    /// Subject-specific and generalist indicators both match.
    pub fn matches(&self, indicator: &RubricIndicator) -> bool {
        indicator.active
            && indicator.year == self.year
            && indicator.level == self.level
            && indicator.module == self.module
            && self.task.is_none_or(|task| indicator.task == Some(task))
            && indicator
                .subject
                .as_deref()
                .is_none_or(|subject| subject == self.subject)
    }
}

/// Source of validated rubric definitions.
#[async_trait]
pub trait RubricRepository: Send + Sync {
    /// Active indicators matching `query`, ordered by indicator id.
    async fn indicators(&self, query: &RubricQuery) -> StorageResult<Vec<RubricIndicator>>;

    /// Inserts or replaces an indicator keyed by indicator id, year, level, subject and
    /// modality. The same indicator id may exist for several subjects or levels.
    async fn upsert_indicator(&self, indicator: &RubricIndicator) -> StorageResult<()>;
}

/// National score distribution per indicator.
#[async_trait]
pub trait StatisticsSource: Send + Sync {
    async fn statistics(
        &self,
        indicator_id: &str,
        year: i32,
        level: &str,
    ) -> StorageResult<Option<IndicatorStatistics>>;
}
