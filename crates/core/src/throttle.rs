//! Rate limiting for progress callbacks.
//!
//! [`Throttle`] remembers when it last fired and only fires again once
//! `period` has elapsed. The first call always fires. Time is passed in
//! explicitly so the adapter can be tested without sleeping.

use std::time::{Duration, Instant};

/// Minimum wall-clock period between process progress updates.
pub const PROCESS_UPDATE_PERIOD: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct Throttle {
    period: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns `true` (and records `now`) if the caller should fire.
    pub fn should_fire_at(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(last) if now.saturating_duration_since(last) < self.period => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }

    /// [`should_fire_at`](Self::should_fire_at) using the current instant.
    pub fn should_fire(&mut self) -> bool {
        self.should_fire_at(Instant::now())
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(PROCESS_UPDATE_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_fires() {
        let mut t = Throttle::new(Duration::from_secs(5));
        assert!(t.should_fire_at(Instant::now()));
    }

    #[test]
    fn calls_within_period_are_suppressed() {
        let mut t = Throttle::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(t.should_fire_at(t0));
        assert!(!t.should_fire_at(t0 + Duration::from_millis(1)));
        assert!(!t.should_fire_at(t0 + Duration::from_millis(4999)));
    }

    #[test]
    fn fires_again_once_period_elapsed() {
        let mut t = Throttle::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(t.should_fire_at(t0));
        assert!(t.should_fire_at(t0 + Duration::from_secs(5)));
        // The window restarts from the last firing, not from t0.
        assert!(!t.should_fire_at(t0 + Duration::from_secs(9)));
        assert!(t.should_fire_at(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn zero_period_always_fires() {
        let mut t = Throttle::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(t.should_fire_at(t0));
        assert!(t.should_fire_at(t0));
    }

    #[test]
    fn default_period_is_five_seconds() {
        assert_eq!(Throttle::default().period(), Duration::from_millis(5000));
    }
}
