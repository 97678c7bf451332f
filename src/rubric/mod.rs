//! Rubric data model.
//!
//! An indicator has exactly four [`PerformanceLevel`]s with fixed scores
//! (1.0, 2.0, 3.0, 4.0). Each level lists its conditions and how they combine
//! (AND / OR). Records are validated on load; an invalid rubric never becomes a
//! [`RubricIndicator`].

pub mod category;
pub mod criteria;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod fixtures;
pub mod repository;
pub mod stats;
pub mod types;
pub mod validation;


pub use category::{Category, CategoryTable};
pub use criteria::{CriteriaReport, check as check_criteria};
pub use error::RubricError;
pub use repository::{RubricQuery, RubricRepository, StatisticsSource};
pub use stats::IndicatorStatistics;
pub use types::{
    CombinationLogic, Condition, Criteria, Level, PerformanceLevel, PerformanceLevels,
    RubricIndicator, RubricRecord, VerificationType,
};
pub use validation::{parse_records, scores_strictly_increase};

/// Result alias for rubric operations.
pub type RubricResult<T> = Result<T, RubricError>;
