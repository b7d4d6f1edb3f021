//! Cancellable deferred tasks keyed by purpose.

use std::time::Instant;

/// The engine's independent timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Coalesces observer changes into one reconciliation pass.
    Activation,
    /// Repeats the schema request until a document arrives.
    SchemaRetry,
    /// Sends the next link/unlink request.
    Scheduler,
}

impl TimerKind {
    const ALL: [TimerKind; 3] = [
        TimerKind::Activation,
        TimerKind::SchemaRetry,
        TimerKind::Scheduler,
    ];

    fn slot(self) -> usize {
        match self {
            TimerKind::Activation => 0,
            TimerKind::SchemaRetry => 1,
            TimerKind::Scheduler => 2,
        }
    }
}

/// At most one pending deadline per [`TimerKind`].
#[derive(Debug, Default, Clone)]
pub struct Timers {
    deadlines: [Option<Instant>; 3],
}

impl Timers {
    /// Creates a set with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer, replacing any pending deadline of the same kind.
    pub fn arm(&mut self, kind: TimerKind, at: Instant) {
        self.deadlines[kind.slot()] = Some(at);
    }

    /// Cancels a timer. Returns true if it was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines[kind.slot()].take().is_some()
    }

    /// Cancels every timer.
    pub fn cancel_all(&mut self) {
        self.deadlines = [None; 3];
    }

    /// Returns true if the timer has a pending deadline.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.deadlines[kind.slot()].is_some()
    }

    /// Returns the pending deadline of a timer.
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.deadlines[kind.slot()]
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Disarms and returns the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        let kind = TimerKind::ALL
            .into_iter()
            .filter_map(|kind| self.deadline(kind).map(|at| (at, kind)))
            .filter(|(at, _)| *at <= now)
            .min_by_key(|(at, _)| *at)
            .map(|(_, kind)| kind)?;
        self.cancel(kind);
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn rearm_replaces_deadline() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.arm(TimerKind::Activation, now + Duration::from_millis(100));
        timers.arm(TimerKind::Activation, now + Duration::from_millis(300));
        assert_eq!(
            timers.deadline(TimerKind::Activation),
            Some(now + Duration::from_millis(300))
        );
        assert!(timers.pop_due(now + Duration::from_millis(200)).is_none());
    }

    #[test]
    fn pop_due_in_deadline_order() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.arm(TimerKind::Scheduler, now + Duration::from_millis(50));
        timers.arm(TimerKind::SchemaRetry, now + Duration::from_millis(10));
        timers.arm(TimerKind::Activation, now + Duration::from_secs(5));
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(10)));

        let later = now + Duration::from_millis(60);
        assert_eq!(timers.pop_due(later), Some(TimerKind::SchemaRetry));
        assert_eq!(timers.pop_due(later), Some(TimerKind::Scheduler));
        assert_eq!(timers.pop_due(later), None);
        assert!(timers.is_armed(TimerKind::Activation));
    }

    #[test]
    fn cancel_all_disarms() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.arm(TimerKind::Scheduler, now);
        assert!(timers.cancel(TimerKind::Scheduler));
        assert!(!timers.cancel(TimerKind::Scheduler));

        timers.arm(TimerKind::Activation, now);
        timers.arm(TimerKind::SchemaRetry, now);
        timers.cancel_all();
        assert_eq!(timers.next_deadline(), None);
    }
}
