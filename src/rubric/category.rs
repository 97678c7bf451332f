//! Continuous score (1.0–4.0) to letter category (A–E).
//!
//! Bucket boundaries are configuration. The default table is the one the portfolio
//! reports use: A ≥ 3.5, B ≥ 3.0, C ≥ 2.5, D ≥ 2.0, E below.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    A,
    B,
    C,
    D,
    E,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::A => "A",
            Category::B => "B",
            Category::C => "C",
            Category::D => "D",
            Category::E => "E",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive) for A, B, C and D. Anything below `d_min` is E.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub a_min: f64,
    pub b_min: f64,
    pub c_min: f64,
    pub d_min: f64,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            a_min: 3.5,
            b_min: 3.0,
            c_min: 2.5,
            d_min: 2.0,
        }
    }
}

impl CategoryTable {
    /// Builds a table, rejecting bounds that are not strictly decreasing within 1.0–4.0.
    pub fn new(a_min: f64, b_min: f64, c_min: f64, d_min: f64) -> Result<Self, ConfigError> {
        let table = Self {
            a_min,
            b_min,
            c_min,
            d_min,
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [self.a_min, self.b_min, self.c_min, self.d_min];
        if bounds.iter().any(|b| !b.is_finite() || !(1.0..=4.0).contains(b)) {
            return Err(ConfigError::InvalidCategoryTable {
                value: self.to_string(),
                reason: "bounds must lie within 1.0 and 4.0".to_string(),
            });
        }
        if !bounds.windows(2).all(|w| w[0] > w[1]) {
            return Err(ConfigError::InvalidCategoryTable {
                value: self.to_string(),
                reason: "bounds must strictly decrease from A to D".to_string(),
            });
        }
        Ok(())
    }

    /// Maps a score to its category. Monotonic: a higher score never maps to a later letter.
    pub fn categorize(&self, score: f64) -> Category {
        if score >= self.a_min {
            Category::A
        } else if score >= self.b_min {
            Category::B
        } else if score >= self.c_min {
            Category::C
        } else if score >= self.d_min {
            Category::D
        } else {
            Category::E
        }
    }
}

impl std::fmt::Display for CategoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.a_min, self.b_min, self.c_min, self.d_min
        )
    }
}

impl FromStr for CategoryTable {
    type Err = ConfigError;

    /// Parses `"a,b,c,d"` lower bounds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: Result<Vec<f64>, _> = s.split(',').map(|p| p.trim().parse::<f64>()).collect();
        let bounds = parsed.map_err(|e| ConfigError::InvalidCategoryTable {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        match bounds.as_slice() {
            [a, b, c, d] => Self::new(*a, *b, *c, *d).map_err(|e| match e {
                ConfigError::InvalidCategoryTable { reason, .. } => {
                    ConfigError::InvalidCategoryTable {
                        value: s.to_string(),
                        reason,
                    }
                }
                other => other,
            }),
            _ => Err(ConfigError::InvalidCategoryTable {
                value: s.to_string(),
                reason: format!("expected 4 bounds, got {}", bounds.len()),
            }),
        }
    }
}
