//! Cancellable delayed action
//!
//! A timer holds at most one pending deadline. Scheduling replaces the
//! pending deadline, so a purpose never has two instances in flight. The
//! owner polls it with the current time; nothing fires on its own.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct DelayTimer {
    deadline: Option<Instant>,
}

impl DelayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule (or reschedule) the action `delay` after `now`
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the pending deadline if it has passed
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_at_deadline() {
        let start = Instant::now();
        let mut timer = DelayTimer::new();
        timer.schedule(start, Duration::from_millis(500));

        assert!(!timer.fire(start + Duration::from_millis(499)));
        assert!(timer.fire(start + Duration::from_millis(500)));
        assert!(!timer.fire(start + Duration::from_millis(600)));
        assert!(!timer.is_pending());
    }

    #[test]
    fn test_reschedule_replaces() {
        let start = Instant::now();
        let mut timer = DelayTimer::new();
        timer.schedule(start, Duration::from_millis(500));
        timer.schedule(start + Duration::from_millis(400), Duration::from_millis(500));

        assert!(!timer.fire(start + Duration::from_millis(600)));
        assert_eq!(timer.deadline(), Some(start + Duration::from_millis(900)));

        timer.cancel();
        assert!(!timer.fire(start + Duration::from_secs(10)));
    }
}
