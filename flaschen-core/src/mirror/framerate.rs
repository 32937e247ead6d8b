//! Commit cadence tracking for diagnostics.

use std::time::{Duration, Instant};

/// Default EWMA smoothing factor.
pub const DEFAULT_SMOOTHING: f64 = 0.9;

/// Exponentially-weighted moving average of the commit rate.
///
/// `rate = rate * s + (1 / Δt) * (1 - s)`, seeded by the first interval.
#[derive(Debug, Clone)]
pub struct FrameRateTracker {
    smoothing: f64,
    last_observed: Option<Instant>,
    rate: Option<f64>,
    last_report: Option<Instant>,
}

impl FrameRateTracker {
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing,
            last_observed: None,
            rate: None,
            last_report: None,
        }
    }

    /// Record a commit happening now.
    pub fn observe(&mut self) {
        self.observe_at(Instant::now());
    }

    /// Record a commit at an explicit instant (useful for testing).
    pub fn observe_at(&mut self, now: Instant) {
        if let Some(last) = self.last_observed {
            let delta = now.saturating_duration_since(last).as_secs_f64();
            if delta > 0.0 {
                let instant_rate = 1.0 / delta;
                let prev = self.rate.unwrap_or(instant_rate);
                self.rate = Some(prev * self.smoothing + instant_rate * (1.0 - self.smoothing));
            }
        }
        self.last_observed = Some(now);
    }

    /// Smoothed commits per second, once two commits have been seen.
    pub fn current_rate(&self) -> Option<f64> {
        self.rate
    }

    /// Whether a periodic rate report is due at `now`.
    ///
    /// Returns `true` at most once per `every`, and only once a rate is
    /// known.
    pub fn should_report(&mut self, now: Instant, every: Duration) -> bool {
        if self.rate.is_none() {
            return false;
        }
        match self.last_report {
            Some(last) if now.saturating_duration_since(last) <= every => false,
            _ => {
                self.last_report = Some(now);
                true
            }
        }
    }

    /// Forget all observations.
    pub fn reset(&mut self) {
        self.last_observed = None;
        self.rate = None;
        self.last_report = None;
    }
}

impl Default for FrameRateTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_until_two_observations() {
        let mut t = FrameRateTracker::default();
        assert_eq!(t.current_rate(), None);
        t.observe_at(Instant::now());
        assert_eq!(t.current_rate(), None);
    }

    #[test]
    fn first_interval_seeds_rate() {
        let mut t = FrameRateTracker::default();
        let t0 = Instant::now();
        t.observe_at(t0);
        t.observe_at(t0 + Duration::from_millis(100));
        let rate = t.current_rate().unwrap();
        assert!((rate - 10.0).abs() < 1e-9, "rate = {rate}");
    }

    #[test]
    fn smoothing_blends_new_intervals() {
        let mut t = FrameRateTracker::new(0.9);
        let t0 = Instant::now();
        t.observe_at(t0);
        t.observe_at(t0 + Duration::from_millis(100)); // 10 fps
        t.observe_at(t0 + Duration::from_millis(150)); // 20 fps instant
        // 10 * 0.9 + 20 * 0.1 = 11
        let rate = t.current_rate().unwrap();
        assert!((rate - 11.0).abs() < 1e-6, "rate = {rate}");
    }

    #[test]
    fn zero_interval_is_ignored() {
        let mut t = FrameRateTracker::default();
        let t0 = Instant::now();
        t.observe_at(t0);
        t.observe_at(t0);
        assert_eq!(t.current_rate(), None);
    }

    #[test]
    fn reports_are_rate_limited() {
        let mut t = FrameRateTracker::default();
        let t0 = Instant::now();
        let every = Duration::from_secs(1);
        assert!(!t.should_report(t0, every));

        t.observe_at(t0);
        t.observe_at(t0 + Duration::from_millis(50));
        assert!(t.should_report(t0, every));
        assert!(!t.should_report(t0 + Duration::from_millis(500), every));
        assert!(t.should_report(t0 + Duration::from_millis(1500), every));
    }

    #[test]
    fn reset_clears_state() {
        let mut t = FrameRateTracker::default();
        let t0 = Instant::now();
        t.observe_at(t0);
        t.observe_at(t0 + Duration::from_millis(10));
        t.reset();
        assert_eq!(t.current_rate(), None);
    }
}
