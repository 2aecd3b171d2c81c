//! Condition Validation
//!
//! Decides whether a source reading is admissible under a set of declarative
//! range and pattern conditions.

mod condition;
mod error;
mod validator;

pub use condition::Condition;
pub use error::ConditionError;
pub use validator::CompiledValidator;
