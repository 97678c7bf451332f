use thiserror::Error;

/// Errors raised while loading or checking rubric definitions.
#[derive(Debug, Error)]
pub enum RubricError {
    /// The record is not valid JSON for the rubric shape.
    #[error("malformed rubric record: {reason}")]
    Malformed { reason: String },

    /// Exactly four performance levels are required.
    #[error("indicator '{indicator_id}' has {found} performance levels, expected 4")]
    WrongLevelCount { indicator_id: String, found: usize },

    /// A level key in `niveles_desempeno` is not a canonical level.
    #[error("unknown performance level '{name}'")]
    UnknownLevel { name: String },

    /// The same canonical level appears twice under different keys.
    #[error("indicator '{indicator_id}' defines level {level} more than once")]
    DuplicateLevel {
        indicator_id: String,
        level: &'static str,
    },

    /// Two levels share the same numeric score.
    #[error("indicator '{indicator_id}' has duplicate score {score}")]
    DuplicateScore { indicator_id: String, score: f64 },

    /// A level's score does not match the canonical score for its name.
    #[error(
        "indicator '{indicator_id}': level {level} has score {found}, canonical score is {expected}"
    )]
    ScoreMismatch {
        indicator_id: String,
        level: &'static str,
        expected: f64,
        found: f64,
    },

    /// The object key and the `nivel` field of a level disagree.
    #[error("indicator '{indicator_id}': key '{key}' holds level {level}")]
    KeyMismatch {
        indicator_id: String,
        key: String,
        level: &'static str,
    },

    /// A level above the floor lists no conditions, so it could never be reached.
    #[error("indicator '{indicator_id}': level {level} has no conditions")]
    EmptyConditions {
        indicator_id: String,
        level: &'static str,
    },

    /// Two conditions across the indicator share an id.
    #[error("indicator '{indicator_id}': duplicate condition id '{condition_id}'")]
    DuplicateConditionId {
        indicator_id: String,
        condition_id: String,
    },

    /// A condition's regex pattern does not compile.
    #[error("condition '{condition_id}': invalid pattern: {reason}")]
    InvalidPattern {
        condition_id: String,
        reason: String,
    },
}
