//! Trailing-edge throttle for scroll/resize bursts
//!
//! The first trigger in a quiet period schedules one deferred run `wait`
//! later. Triggers that arrive while that run is pending are dropped: they
//! neither queue a second run nor push the deadline back. The host drives
//! time by calling [`Throttle::take_due`] from its frame loop or timer.

use std::time::{Duration, Instant};

/// Default time between re-evaluations, roughly one frame at 75Hz
pub const DEFAULT_DELAY: Duration = Duration::from_millis(13);

/// Coalesces triggers into at most one deferred run per window
#[derive(Debug, Clone)]
pub struct Throttle {
    wait: Duration,
    pending: Option<Instant>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl Throttle {
    /// Create a throttle with the given window
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: None,
        }
    }

    /// The throttle window
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Record a trigger at `now`
    ///
    /// Returns `true` if this trigger scheduled a new run, `false` if a run
    /// was already pending and the trigger was dropped.
    pub fn trigger(&mut self, now: Instant) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(now.checked_add(self.wait).unwrap_or(now));
        true
    }

    /// When the pending run is due, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Check if a run is scheduled
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consume the pending run if its deadline has passed
    ///
    /// Returns `true` when the caller should run the throttled work now.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if deadline <= now => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(13);

    #[test]
    fn test_first_trigger_schedules() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WAIT);

        assert!(!throttle.is_pending());
        assert!(throttle.trigger(start));
        assert_eq!(throttle.deadline(), Some(start + WAIT));
    }

    #[test]
    fn test_burst_is_coalesced() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WAIT);

        assert!(throttle.trigger(start));
        for ms in 1..13 {
            assert!(!throttle.trigger(start + Duration::from_millis(ms)));
        }
        // Deadline was not extended by the dropped triggers
        assert_eq!(throttle.deadline(), Some(start + WAIT));
    }

    #[test]
    fn test_take_due_waits_for_deadline() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WAIT);
        throttle.trigger(start);

        assert!(!throttle.take_due(start + Duration::from_millis(12)));
        assert!(throttle.take_due(start + WAIT));
        assert!(!throttle.is_pending());
        assert!(!throttle.take_due(start + Duration::from_millis(100)));
    }

    #[test]
    fn test_new_window_after_run() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WAIT);
        throttle.trigger(start);
        throttle.take_due(start + WAIT);

        let later = start + Duration::from_millis(40);
        assert!(throttle.trigger(later));
        assert_eq!(throttle.deadline(), Some(later + WAIT));
    }

    #[test]
    fn test_zero_wait_runs_on_next_check() {
        let start = Instant::now();
        let mut throttle = Throttle::new(Duration::ZERO);

        assert!(throttle.trigger(start));
        assert!(throttle.take_due(start));
    }

    #[test]
    fn test_default_delay() {
        assert_eq!(Throttle::default().wait(), DEFAULT_DELAY);
    }
}
