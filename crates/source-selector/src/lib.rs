//! Source Selection
//!
//! Probes redundant sources in priority order and picks the first one
//! currently reporting an admissible value.

mod probe;
mod registry;
mod selector;

pub use probe::{probe, Probe, SourceSnapshot, UNAVAILABLE_STATES};
pub use registry::{ListenerId, MemoryRegistry, Notifier, Registry, SourceRecord, SubscriptionId};
pub use selector::{select_active, Selection};

/// Identifier of an external value source
pub type SourceId = String;
