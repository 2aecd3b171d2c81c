//! Condition Definitions

use crate::error::ConditionError;
use serde::{Deserialize, Serialize};

/// Tag used for numeric range conditions
pub const CONDITION_TYPE_RANGE: &str = "range";
/// Tag used for regular expression conditions
pub const CONDITION_TYPE_REGEX: &str = "regex";

/// A declarative admissibility rule applied to a source value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    /// Value must parse as a number within `[min, max]`; either bound may be omitted
    Range { min: Option<f64>, max: Option<f64> },
    /// Value must match the pattern from its first character
    Regex { pattern: Option<String> },
    /// Condition kind this version does not understand
    Unknown(String),
}

impl Condition {
    /// Range condition with both bounds
    pub fn range(min: f64, max: f64) -> Self {
        Condition::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Range condition with a lower bound only
    pub fn at_least(min: f64) -> Self {
        Condition::Range {
            min: Some(min),
            max: None,
        }
    }

    /// Range condition with an upper bound only
    pub fn at_most(max: f64) -> Self {
        Condition::Range {
            min: None,
            max: Some(max),
        }
    }

    /// Pattern condition
    pub fn regex(pattern: impl Into<String>) -> Self {
        Condition::Regex {
            pattern: Some(pattern.into()),
        }
    }

    /// Name of the condition kind as it appears in configuration
    pub fn kind(&self) -> &str {
        match self {
            Condition::Range { .. } => CONDITION_TYPE_RANGE,
            Condition::Regex { .. } => CONDITION_TYPE_REGEX,
            Condition::Unknown(kind) => kind,
        }
    }

    /// Check the condition is well formed.
    ///
    /// Pattern syntax is deliberately not checked here: a pattern that fails
    /// to compile is tolerated and rejects every value at evaluation time.
    pub fn validate(&self) -> Result<(), ConditionError> {
        if let Condition::Range { min, max } = self {
            if min.is_some_and(f64::is_nan) || max.is_some_and(f64::is_nan) {
                return Err(ConditionError::NanBound);
            }
            if let (Some(min), Some(max)) = (*min, *max) {
                if min > max {
                    return Err(ConditionError::InvertedRange { min, max });
                }
            }
        }
        Ok(())
    }
}

/// Flat record shape used in configuration files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawCondition {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
}

impl From<RawCondition> for Condition {
    fn from(raw: RawCondition) -> Self {
        match raw.kind.as_str() {
            CONDITION_TYPE_RANGE => Condition::Range {
                min: raw.min,
                max: raw.max,
            },
            CONDITION_TYPE_REGEX => Condition::Regex {
                pattern: raw.pattern,
            },
            _ => Condition::Unknown(raw.kind),
        }
    }
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::Range { min, max } => RawCondition {
                kind: CONDITION_TYPE_RANGE.to_string(),
                min,
                max,
                pattern: None,
            },
            Condition::Regex { pattern } => RawCondition {
                kind: CONDITION_TYPE_REGEX.to_string(),
                pattern,
                ..Default::default()
            },
            Condition::Unknown(kind) => RawCondition {
                kind,
                ..Default::default()
            },
        }
    }
}
