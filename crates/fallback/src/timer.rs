//! Deferred Timer Queue
//!
//! Owns the deadlines of scheduled one-shot callbacks. The queue never runs
//! anything itself: the host asks for due handles and routes them back into
//! the owning engine.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Handle of a scheduled timer. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// Arena of live timers keyed by handle
#[derive(Debug, Default)]
pub struct TimerQueue {
    /// Deadline of each live timer
    timers: BTreeMap<TimerHandle, DateTime<Utc>>,
    /// Next handle to hand out
    next_handle: u64,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer firing at `deadline`
    pub fn schedule(&mut self, deadline: DateTime<Utc>) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.insert(handle, deadline);
        handle
    }

    /// Cancel a timer. Cancelling a fired or cancelled timer is a no-op
    /// and returns false.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    /// Deadline of a live timer
    pub fn deadline(&self, handle: TimerHandle) -> Option<DateTime<Utc>> {
        self.timers.get(&handle).copied()
    }

    /// Earliest deadline among live timers
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.values().min().copied()
    }

    /// Remove and return the earliest timer due at `now`
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(TimerHandle, DateTime<Utc>)> {
        let (handle, deadline) = self
            .timers
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .min_by_key(|(handle, deadline)| (**deadline, **handle))
            .map(|(handle, deadline)| (*handle, *deadline))?;
        self.timers.remove(&handle);
        Some((handle, deadline))
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether no timers are live
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::UNIX_EPOCH + TimeDelta::seconds(secs)
    }

    #[test]
    fn test_schedule_and_pop_due() {
        let mut queue = TimerQueue::new();
        let late = queue.schedule(at(10));
        let early = queue.schedule(at(5));
        assert_eq!(queue.next_deadline(), Some(at(5)));

        assert_eq!(queue.pop_due(at(4)), None);
        assert_eq!(queue.pop_due(at(10)), Some((early, at(5))));
        assert_eq!(queue.pop_due(at(10)), Some((late, at(10))));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(at(5));
        assert!(queue.cancel(handle));
        assert!(!queue.cancel(handle));
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut queue = TimerQueue::new();
        let handle = queue.schedule(at(1));
        assert!(queue.pop_due(at(1)).is_some());
        assert!(!queue.cancel(handle));
    }

    #[test]
    fn test_handles_not_reused() {
        let mut queue = TimerQueue::new();
        let first = queue.schedule(at(1));
        queue.cancel(first);
        let second = queue.schedule(at(1));
        assert_ne!(first, second);
        assert_eq!(queue.deadline(first), None);
        assert_eq!(queue.deadline(second), Some(at(1)));
        assert!(queue.cancel(second));
        assert_eq!(queue.len(), 0);
    }
}
