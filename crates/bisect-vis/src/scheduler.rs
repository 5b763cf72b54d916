//! Virtual clock with single-shot timers.
//!
//! The controller never sleeps. It schedules timers here and the caller
//! moves the clock forward, either from a test (`advance_by`) or from the
//! server's driver task mapping real time onto it.
//!
//! # Invariants
//!
//! 1. Timers fire in `(deadline, id)` order; ids increase with scheduling
//!    order, so ties go to the earlier schedule.
//! 2. A cancelled timer is gone: `pop_due` can never return it.
//! 3. The clock never moves backwards.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Auto-advance by one step.
    Advance,
    /// Settle time after a terminal step before looping to a new target.
    Cooldown,
    /// Delay between arming a restart and starting the new run.
    StartDelay,
}

/// Millisecond virtual clock and its pending timers.
#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_id: u64,
    queue: BTreeMap<(u64, TimerId), TimerKind>,
    deadlines: HashMap<TimerId, u64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule a timer `delay_ms` from now.
    pub fn schedule(&mut self, kind: TimerKind, delay_ms: u64) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = self.now_ms + delay_ms;
        self.queue.insert((deadline, id), kind);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.queue.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Number of pending timers.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deadline of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.keys().next().map(|&(deadline, _)| deadline)
    }

    /// Remove and return the earliest timer due at or before `until_ms`.
    ///
    /// The clock moves to that timer's deadline.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<(TimerId, TimerKind)> {
        let (&(deadline, id), _) = self.queue.iter().next()?;
        if deadline > until_ms {
            return None;
        }
        let kind = self.queue.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        self.now_ms = self.now_ms.max(deadline);
        Some((id, kind))
    }

    /// Move the clock to `until_ms` without firing anything.
    pub fn settle(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut s = Scheduler::new();
        let late = s.schedule(TimerKind::Cooldown, 300);
        let early = s.schedule(TimerKind::Advance, 100);

        assert_eq!(s.next_deadline(), Some(100));
        assert_eq!(s.pop_due(1000), Some((early, TimerKind::Advance)));
        assert_eq!(s.now_ms(), 100);
        assert_eq!(s.pop_due(1000), Some((late, TimerKind::Cooldown)));
        assert_eq!(s.pop_due(1000), None);
    }

    #[test]
    fn ties_go_to_earlier_schedule() {
        let mut s = Scheduler::new();
        let first = s.schedule(TimerKind::StartDelay, 50);
        let second = s.schedule(TimerKind::Advance, 50);
        assert_eq!(s.pop_due(50).map(|(id, _)| id), Some(first));
        assert_eq!(s.pop_due(50).map(|(id, _)| id), Some(second));
    }

    #[test]
    fn nothing_fires_early() {
        let mut s = Scheduler::new();
        s.schedule(TimerKind::Advance, 650);
        assert_eq!(s.pop_due(649), None);
        assert!(s.pop_due(650).is_some());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut s = Scheduler::new();
        let id = s.schedule(TimerKind::Advance, 10);
        assert!(s.is_pending(id));
        assert!(s.cancel(id));
        assert!(!s.is_pending(id));
        assert!(!s.cancel(id));
        assert_eq!(s.pop_due(u64::MAX), None);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn clock_is_monotonic() {
        let mut s = Scheduler::new();
        s.settle(500);
        s.settle(100);
        assert_eq!(s.now_ms(), 500);

        let id = s.schedule(TimerKind::Advance, 20);
        assert_eq!(s.next_deadline(), Some(520));
        assert_eq!(s.pop_due(600), Some((id, TimerKind::Advance)));
        assert_eq!(s.now_ms(), 520);
    }
}
