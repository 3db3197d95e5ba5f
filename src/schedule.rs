use std::time::{Duration, Instant};

/// A single pending unit of work on the UI thread, identified only by the
/// time it becomes due. Clearing the marker is the only form of cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Deferred {
    due: Option<Instant>,
}

impl Deferred {
    /// Schedules unless something is already pending. Returns whether it did.
    pub fn schedule(&mut self, now: Instant, delay: Duration) -> bool {
        if self.due.is_some() {
            return false;
        }
        self.due = Some(now + delay);
        true
    }

    /// Drops whatever is pending and schedules again (debounce).
    pub fn reschedule(&mut self, now: Instant, delay: Duration) {
        self.due = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    /// Clears the marker and returns true once the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.due.map(|due| due.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn fires_once_after_delay() {
        let t0 = Instant::now();
        let mut d = Deferred::default();
        assert!(d.schedule(t0, 80 * MS));
        assert!(!d.fire(t0 + 79 * MS));
        assert!(d.fire(t0 + 80 * MS));
        assert!(!d.fire(t0 + 200 * MS));
        assert_eq!(d.remaining(t0), None);
    }

    #[test]
    fn schedule_keeps_existing_deadline() {
        let t0 = Instant::now();
        let mut d = Deferred::default();
        d.schedule(t0, 80 * MS);
        assert!(!d.schedule(t0 + 50 * MS, 80 * MS));
        assert!(d.fire(t0 + 80 * MS));
    }

    #[test]
    fn reschedule_pushes_deadline_back() {
        let t0 = Instant::now();
        let mut d = Deferred::default();
        d.reschedule(t0, 40 * MS);
        d.reschedule(t0 + 30 * MS, 40 * MS);
        assert!(!d.fire(t0 + 50 * MS));
        assert_eq!(d.remaining(t0 + 50 * MS), Some(20 * MS));
        assert!(d.fire(t0 + 70 * MS));
    }

    #[test]
    fn cancel_clears_marker() {
        let t0 = Instant::now();
        let mut d = Deferred::default();
        d.schedule(t0, MS);
        d.cancel();
        assert!(!d.fire(t0 + 10 * MS));
        assert_eq!(d.remaining(t0), None);
    }
}
