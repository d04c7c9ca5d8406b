/// Session clock advanced by the host's frame delta rather than wall time, so
/// replays and tests tick deterministically.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionClock {
    elapsed: f64,
    delta: f32,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds. Negative or non-finite deltas count as zero.
    pub fn tick(&mut self, dt: f32) {
        self.delta = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.elapsed += f64::from(self.delta);
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Repeating deadline polled from the tick. Arming replaces any pending deadline;
/// a cancelled timer never fires until armed again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTimer {
    interval: f64,
    next_due: Option<f64>,
}

impl IntervalTimer {
    pub fn new(interval_seconds: f32) -> Self {
        let interval = if interval_seconds.is_finite() && interval_seconds > 0.0 { interval_seconds } else { 20.0 };
        Self { interval: f64::from(interval), next_due: None }
    }

    pub fn interval_seconds(&self) -> f64 {
        self.interval
    }

    pub fn arm(&mut self, now: f64) {
        self.next_due = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<f64> {
        self.next_due
    }

    /// Fire at most once per poll. Deadlines missed during a long gap coalesce
    /// into one firing and the next one is scheduled from `now`.
    pub fn poll(&mut self, now: f64) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let next = due + self.interval;
        self.next_due = Some(if next > now { next } else { now + self.interval });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_ignores_bad_deltas() {
        let mut clock = SessionClock::new();
        clock.tick(0.5);
        clock.tick(f32::NAN);
        clock.tick(-1.0);
        assert_eq!(clock.elapsed_seconds(), 0.5);
        assert_eq!(clock.delta_seconds(), 0.0);
    }

    #[test]
    fn timer_fires_once_per_interval_and_coalesces_gaps() {
        let mut timer = IntervalTimer::new(2.0);
        assert!(!timer.poll(10.0));
        timer.arm(0.0);
        assert!(!timer.poll(1.9));
        assert!(timer.poll(2.0));
        assert!(!timer.poll(3.0));
        assert!(timer.poll(11.0));
        assert_eq!(timer.next_due(), Some(13.0));
        timer.cancel();
        assert!(!timer.poll(100.0));
    }
}
