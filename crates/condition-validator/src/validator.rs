//! Compiled Condition Validator

use crate::condition::Condition;
use regex::Regex;
use tracing::{debug, error, warn};

/// A condition prepared for repeated evaluation
#[derive(Debug, Clone)]
enum CompiledRule {
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
    /// `regex` is `None` when the pattern failed to compile; such a rule
    /// admits nothing
    Pattern {
        pattern: String,
        regex: Option<Regex>,
    },
    /// Regex condition without a pattern
    EmptyPattern,
    Unknown(String),
}

/// Validator holding precompiled conditions, combined with logical AND
#[derive(Debug, Clone, Default)]
pub struct CompiledValidator {
    rules: Vec<CompiledRule>,
}

impl CompiledValidator {
    /// Compile a set of conditions. Patterns are compiled once here.
    pub fn compile(conditions: &[Condition]) -> Self {
        let rules = conditions.iter().map(compile_rule).collect();
        Self { rules }
    }

    /// Number of compiled conditions
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no conditions are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check a value against every condition
    pub fn is_valid(&self, value: &str) -> bool {
        self.rules.iter().all(|rule| check_rule(rule, value))
    }
}

fn compile_rule(condition: &Condition) -> CompiledRule {
    match condition {
        Condition::Range { min, max } => CompiledRule::Range {
            min: *min,
            max: *max,
        },
        Condition::Regex { pattern } => match pattern.as_deref() {
            None | Some("") => CompiledRule::EmptyPattern,
            Some(pattern) => CompiledRule::Pattern {
                pattern: pattern.to_string(),
                regex: compile_anchored(pattern),
            },
        },
        Condition::Unknown(kind) => {
            warn!("Unknown condition type: {:?}", kind);
            CompiledRule::Unknown(kind.clone())
        }
    }
}

/// Compile `pattern` so it only matches from the start of the input.
///
/// The raw pattern is checked on its own first, otherwise an unbalanced
/// group could pair up with the wrapping group and compile.
fn compile_anchored(pattern: &str) -> Option<Regex> {
    let anchored = Regex::new(pattern).and_then(|_| Regex::new(&format!("^(?:{})", pattern)));
    match anchored {
        Ok(regex) => Some(regex),
        Err(err) => {
            error!("Invalid regex pattern '{}': {}", pattern, err);
            None
        }
    }
}

fn check_rule(rule: &CompiledRule, value: &str) -> bool {
    match rule {
        CompiledRule::Range { min, max } => check_range(value, *min, *max),
        CompiledRule::Pattern { pattern, regex } => {
            let Some(regex) = regex else {
                return false;
            };
            let matches = regex.is_match(value);
            if !matches {
                debug!("State '{}' does not match pattern '{}'", value, pattern);
            }
            matches
        }
        CompiledRule::EmptyPattern => true,
        CompiledRule::Unknown(kind) => {
            debug!("Ignoring unknown condition type {:?}", kind);
            true
        }
    }
}

/// Parse a reading as a float. Single underscores between digits are
/// accepted as digit separators (`1_000`).
fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if !value.contains('_') {
        return value.parse().ok();
    }

    let bytes = value.as_bytes();
    let mut digits = String::with_capacity(value.len());
    for (i, c) in value.char_indices() {
        if c != '_' {
            digits.push(c);
            continue;
        }
        let after_digit = i > 0 && bytes[i - 1].is_ascii_digit();
        let before_digit = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if !(after_digit && before_digit) {
            return None;
        }
    }
    digits.parse().ok()
}

fn check_range(value: &str, min: Option<f64>, max: Option<f64>) -> bool {
    let Some(number) = parse_number(value) else {
        debug!("Cannot convert state '{}' to number for range check", value);
        return false;
    };

    if let Some(min) = min {
        if number < min {
            debug!("Value {} is below minimum {}", number, min);
            return false;
        }
    }

    if let Some(max) = max {
        if number > max {
            debug!("Value {} is above maximum {}", number, max);
            return false;
        }
    }

    true
}
