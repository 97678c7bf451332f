//! Deterministic pre-check of a condition's machine-checkable criteria.
//!
//! The report is advisory. It is attached to condition outcomes so reviewers can see
//! where the model's judgment and the surface checks disagree; it never changes the level.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use super::error::RubricError;
use super::types::Condition;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaReport {
    pub keywords_found: Vec<String>,
    pub keywords_missing: Vec<String>,
    /// `None` when the condition sets no minimum length.
    pub meets_min_length: Option<bool>,
    pub elements_missing: Vec<String>,
    /// `None` when the condition sets no pattern.
    pub pattern_matched: Option<bool>,
}

impl CriteriaReport {
    /// `true` when every criterion that was set passed. Keywords need at least one hit.
    pub fn passed(&self) -> bool {
        let keywords_ok = self.keywords_missing.is_empty() || !self.keywords_found.is_empty();
        keywords_ok
            && self.meets_min_length.unwrap_or(true)
            && self.elements_missing.is_empty()
            && self.pattern_matched.unwrap_or(true)
    }
}

/// Runs the condition's criteria against `text`. Matching is case-insensitive.
pub fn check(condition: &Condition, text: &str) -> Result<CriteriaReport, RubricError> {
    let criteria = &condition.criteria;
    let haystack = text.to_lowercase();

    let (keywords_found, keywords_missing): (Vec<String>, Vec<String>) = criteria
        .keywords
        .iter()
        .cloned()
        .partition(|kw| haystack.contains(&kw.to_lowercase()));

    let meets_min_length = criteria
        .min_length
        .map(|min| text.trim().chars().count() >= min);

    let elements_missing = criteria
        .required_elements
        .iter()
        .filter(|el| !haystack.contains(&el.to_lowercase()))
        .cloned()
        .collect();

    let pattern_matched = match criteria.pattern.as_deref() {
        Some(pattern) => {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| RubricError::InvalidPattern {
                    condition_id: condition.id.clone(),
                    reason: e.to_string(),
                })?;
            Some(re.is_match(text))
        }
        None => None,
    };

    Ok(CriteriaReport {
        keywords_found,
        keywords_missing,
        meets_min_length,
        elements_missing,
        pattern_matched,
    })
}
