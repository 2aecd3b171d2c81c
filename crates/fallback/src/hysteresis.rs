//! Hysteresis Gate
//!
//! Debounce state machine layered over the raw selector output. The gate is
//! either stable on the active source or pending on a candidate that must
//! remain the best choice for the whole delay before it is applied.

use crate::timer::{TimerHandle, TimerQueue};
use chrono::{DateTime, TimeDelta, Utc};
use source_selector::SourceId;

/// Candidate awaiting confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    /// Proposed source; `None` proposes "no source available"
    pub candidate: Option<SourceId>,
    /// When the candidate was first proposed
    pub since: DateTime<Utc>,
    /// Deferred apply timer
    pub timer: TimerHandle,
}

/// Outcome of feeding a proposal through the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Proposal is the active source; refresh it in place
    Confirm,
    /// Switch to the proposal now
    Apply,
    /// New candidate; a timer was armed for `deadline`
    Defer { deadline: DateTime<Utc> },
    /// Candidate already pending; the armed timer stands
    Wait,
}

/// Per-engine debounce state
#[derive(Debug)]
pub struct HysteresisGate {
    /// Required dwell time for a candidate
    delay: TimeDelta,
    /// Candidate awaiting confirmation, if any
    pending: Option<Pending>,
}

impl HysteresisGate {
    /// Create a gate. A zero delay applies every change immediately.
    pub fn new(delay: TimeDelta) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Current pending candidate
    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }

    /// Whether `handle` is the timer of the pending candidate
    pub fn owns_timer(&self, handle: TimerHandle) -> bool {
        self.pending.as_ref().is_some_and(|p| p.timer == handle)
    }

    /// Decide what to do with `proposed` while `active` is confirmed
    pub fn evaluate(
        &mut self,
        active: Option<&str>,
        proposed: Option<&str>,
        now: DateTime<Utc>,
        timers: &mut TimerQueue,
    ) -> GateDecision {
        if proposed == active {
            self.clear(timers);
            return GateDecision::Confirm;
        }

        if self.delay.is_zero() || active.is_none() {
            self.clear(timers);
            return GateDecision::Apply;
        }

        if let Some(pending) = &self.pending {
            if pending.candidate.as_deref() == proposed {
                if now - pending.since >= self.delay {
                    self.clear(timers);
                    return GateDecision::Apply;
                }
                return GateDecision::Wait;
            }
        }

        self.clear(timers);
        let deadline = now
            .checked_add_signed(self.delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let timer = timers.schedule(deadline);
        self.pending = Some(Pending {
            candidate: proposed.map(str::to_string),
            since: now,
            timer,
        });
        GateDecision::Defer { deadline }
    }

    /// Drop the pending candidate and cancel its timer
    pub fn clear(&mut self, timers: &mut TimerQueue) {
        if let Some(pending) = self.pending.take() {
            timers.cancel(pending.timer);
        }
    }
}
