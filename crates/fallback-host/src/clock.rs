//! Runtime Clock

use chrono::{DateTime, TimeDelta, Utc};
use fallback::Clock;
use tokio::time::Instant;

/// Wall clock that advances with the tokio timer, so paused test time
/// and engine timestamps agree
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
    origin_utc: DateTime<Utc>,
}

impl TokioClock {
    /// Anchor the clock at the current time
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Anchor the clock at `origin_utc`
    pub fn starting_at(origin_utc: DateTime<Utc>) -> Self {
        Self {
            origin: Instant::now(),
            origin_utc,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.origin.elapsed())
            .ok()
            .and_then(|elapsed| self.origin_utc.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
