//! Sliding-window rate limiter.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use contracts::{ContractError, Identity, RateLimitConfig};
use tracing::{debug, trace};

/// Per-identity sliding-window counter
///
/// Each identity owns an insertion-ordered window of hit timestamps.
/// Entries older than `window` are evicted exactly on every hit, so the
/// count never drifts at bucket boundaries.
pub struct RateLimiter {
    max_events: usize,
    window: Duration,
    windows: Mutex<HashMap<Identity, VecDeque<Instant>>>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_events", &self.max_events)
            .field("window", &self.window)
            .field("identities", &self.tracked_identities())
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter allowing `max_events` per trailing `window`
    ///
    /// # Errors
    /// `max_events == 0` or a zero `window`
    pub fn new(max_events: usize, window: Duration) -> Result<Self, ContractError> {
        if max_events == 0 {
            return Err(ContractError::invalid_parameter(
                "max_events",
                "must be >= 1",
            ));
        }
        if window.is_zero() {
            return Err(ContractError::invalid_parameter("window_sec", "must be > 0"));
        }

        Ok(Self {
            max_events,
            window,
            windows: Mutex::new(HashMap::new()),
        })
    }

    /// Create from configuration
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, ContractError> {
        Self::new(config.max_events, config.window())
    }

    /// Record a hit for `identity` at `now` and report whether it exceeds the limit
    ///
    /// Returns true when the identity has more than `max_events` hits
    /// inside the trailing window (caller should suppress / penalize).
    pub fn record_and_check(&self, identity: &Identity, now: Instant) -> bool {
        let mut windows = self.lock();

        let hits = windows.entry(identity.clone()).or_default();
        hits.push_back(now);
        Self::evict_expired(hits, now, self.window);

        let exceeded = hits.len() > self.max_events;
        trace!(
            identity = %identity,
            hits = hits.len(),
            max = self.max_events,
            exceeded,
            "rate window updated"
        );
        exceeded
    }

    /// Drop identities whose whole window has expired
    ///
    /// Returns the number of identities removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();

        windows.retain(|_, hits| {
            Self::evict_expired(hits, now, self.window);
            !hits.is_empty()
        });

        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, remaining = windows.len(), "rate limiter sweep");
        }
        removed
    }

    /// Number of identities currently holding a window
    pub fn tracked_identities(&self) -> usize {
        self.lock().len()
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Pop from the front while the oldest hit is older than `window`
    ///
    /// Non-monotonic timestamps saturate to zero age and are kept.
    fn evict_expired(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&oldest) = hits.front() {
            if now.saturating_duration_since(oldest) > window {
                hits.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Identity, VecDeque<Instant>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            RateLimiter::new(0, secs(8)),
            Err(ContractError::InvalidParameter { .. })
        ));
        assert!(matches!(
            RateLimiter::new(5, Duration::ZERO),
            Err(ContractError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_first_max_events_pass_then_throttle() {
        let limiter = RateLimiter::new(3, secs(10)).unwrap();
        let id = Identity::from("u1");
        let now = Instant::now();

        for _ in 0..3 {
            assert!(!limiter.record_and_check(&id, now));
        }
        assert!(limiter.record_and_check(&id, now));
        assert!(limiter.record_and_check(&id, now));
    }

    #[test]
    fn test_unknown_identity_never_throttled_on_first_event() {
        let limiter = RateLimiter::new(1, secs(10)).unwrap();
        let now = Instant::now();
        assert!(!limiter.record_and_check(&"a".into(), now));
        assert!(!limiter.record_and_check(&"b".into(), now));
        assert!(limiter.record_and_check(&"a".into(), now));
    }

    #[test]
    fn test_window_fully_expires() {
        let limiter = RateLimiter::new(5, secs(8)).unwrap();
        let id = Identity::from("u1");
        let t0 = Instant::now();

        for _ in 0..5 {
            assert!(!limiter.record_and_check(&id, t0));
        }
        assert!(!limiter.record_and_check(&id, t0 + secs(8) + millis(1)));
    }

    #[test]
    fn test_flood_scenario() {
        // 6 messages within one second, then a 7th nine seconds after the first
        let limiter = RateLimiter::new(5, secs(8)).unwrap();
        let id = Identity::from("u1");
        let t0 = Instant::now();

        let results: Vec<bool> = (0..6)
            .map(|i| limiter.record_and_check(&id, t0 + millis(i * 150)))
            .collect();
        assert_eq!(results, vec![false, false, false, false, false, true]);

        assert!(!limiter.record_and_check(&id, t0 + secs(9)));
    }

    #[test]
    fn test_boundary_entry_exactly_window_old_is_kept() {
        let limiter = RateLimiter::new(1, secs(8)).unwrap();
        let id = Identity::from("u1");
        let t0 = Instant::now();

        assert!(!limiter.record_and_check(&id, t0));
        // age == window is still inside the window
        assert!(limiter.record_and_check(&id, t0 + secs(8)));
    }

    #[test]
    fn test_non_monotonic_timestamps_do_not_panic() {
        let limiter = RateLimiter::new(2, secs(1)).unwrap();
        let id = Identity::from("u1");
        let t0 = Instant::now();

        limiter.record_and_check(&id, t0 + secs(5));
        limiter.record_and_check(&id, t0);
        limiter.record_and_check(&id, t0 + secs(2));
    }

    #[test]
    fn test_sweep_removes_idle_identities() {
        let limiter = RateLimiter::new(5, secs(8)).unwrap();
        let t0 = Instant::now();

        limiter.record_and_check(&"old".into(), t0);
        limiter.record_and_check(&"fresh".into(), t0 + secs(6));
        assert_eq!(limiter.tracked_identities(), 2);

        let removed = limiter.sweep(t0 + secs(10));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_identities(), 1);
    }

    #[test]
    fn test_concurrent_hits_are_all_counted() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(1000, secs(60)).unwrap());
        let now = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        limiter.record_and_check(&"shared".into(), now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // exactly 1000 recorded: the next one is the first over the limit
        assert!(limiter.record_and_check(&"shared".into(), now));
    }
}
