//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric environment variable could not be parsed.
    #[error("failed to parse {name}='{value}': {reason}")]
    ParseError {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A value parsed but is outside its accepted range.
    #[error("invalid value for {name}: {reason}")]
    OutOfRange { name: &'static str, reason: String },

    /// The score-to-category table is malformed.
    #[error("invalid category thresholds '{value}': {reason}")]
    InvalidCategoryTable { value: String, reason: String },

    /// A URL setting is empty.
    #[error("{name} must not be empty")]
    EmptyValue { name: &'static str },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Path exists but is a directory (when a file was expected).
    #[error("path is a directory, expected a file: {path}")]
    NotAFile { path: PathBuf },
}
