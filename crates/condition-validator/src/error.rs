//! Condition Error Types

use thiserror::Error;

/// Errors raised when a condition is accepted into a configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    /// Range bounds are inverted
    #[error("range condition has min {min} greater than max {max}")]
    InvertedRange { min: f64, max: f64 },

    /// Range bound is NaN
    #[error("range condition bound is not a number")]
    NanBound,
}
