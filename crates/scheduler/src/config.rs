//! Scheduler configuration

use std::time::Duration;

use tracing::warn;

use crate::error::SchedulerError;

/// Shortest accepted interval; shorter non-zero intervals are raised to it
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// How long `stop()` waits for an in-flight tick by default
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Configuration for a periodic job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Wait between the end of one tick and the start of the next
    pub interval: Duration,
    /// Run one tick immediately on start
    pub send_on_start: bool,
    /// Bound on how long `stop()` waits for the in-flight tick
    pub grace_period: Duration,
}

impl SchedulerConfig {
    /// Create a config with the given interval
    ///
    /// Intervals below [`MIN_INTERVAL`] are floored to it.
    ///
    /// # Errors
    /// Returns `SchedulerError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }

        let interval = if interval < MIN_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                floor_ms = MIN_INTERVAL.as_millis() as u64,
                "Scheduler interval below floor, raising"
            );
            MIN_INTERVAL
        } else {
            interval
        };

        Ok(Self {
            interval,
            send_on_start: false,
            grace_period: DEFAULT_GRACE_PERIOD,
        })
    }

    /// Create a config from whole seconds
    pub fn from_secs(interval_sec: u64) -> Result<Self, SchedulerError> {
        Self::new(Duration::from_secs(interval_sec))
    }

    /// Set whether to tick immediately on start
    pub fn with_send_on_start(mut self, send_on_start: bool) -> Self {
        self.send_on_start = send_on_start;
        self
    }

    /// Set the stop grace period
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}
