//! Fallback Sensor Engine
//!
//! Republishes the value of the highest-priority redundant source that is
//! currently valid, debounces source switches with a hysteresis delay, and
//! tracks switch provenance.

mod clock;
mod config;
mod engine;
mod hysteresis;
mod publish;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig, DEFAULT_HYSTERESIS_DELAY, DEFAULT_NAME, MIN_SOURCES};
pub use engine::{EngineState, FallbackEngine};
pub use hysteresis::{GateDecision, HysteresisGate, Pending};
pub use publish::{DescriptiveMetadata, OutputAttributes, Provenance, Publication, Publisher};
pub use timer::{TimerHandle, TimerQueue};
