//! Router metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use crate::outcome::{DropReason, RouteOutcome};

/// In-process counters for routing decisions
///
/// Mirrored to the `metrics` facade by the router; these copies back the
/// stats digest and the CLI summary.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Messages relayed to the other platform
    forwarded: AtomicU64,
    /// Dropped: text carried the other side's marker
    loop_dropped: AtomicU64,
    /// Dropped: sender over the rate limit
    rate_limited: AtomicU64,
    /// Dropped: syndicated item already posted
    duplicates: AtomicU64,
    /// Accepted but not delivered
    send_failed: AtomicU64,
    /// Broadcast deliveries (one per platform)
    broadcasts_delivered: AtomicU64,
    /// Broadcast deliveries that failed
    broadcasts_failed: AtomicU64,
    /// Broadcasts suppressed as already posted
    broadcasts_duplicate: AtomicU64,
}

impl RouterMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one routing decision
    pub fn record(&self, outcome: &RouteOutcome) {
        let counter = match outcome {
            RouteOutcome::Forwarded { .. } => &self.forwarded,
            RouteOutcome::Dropped(DropReason::LoopPrevention) => &self.loop_dropped,
            RouteOutcome::Dropped(DropReason::RateLimited) => &self.rate_limited,
            RouteOutcome::Dropped(DropReason::Duplicate) => &self.duplicates,
            RouteOutcome::SendFailed(_) => &self.send_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn send_failed(&self) -> u64 {
        self.send_failed.load(Ordering::Relaxed)
    }

    /// Count a duplicate broadcast (suppressed before sending)
    pub fn inc_broadcast_duplicate(&self) {
        self.broadcasts_duplicate.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one broadcast delivery attempt
    pub fn record_broadcast_delivery(&self, delivered: bool) {
        if delivered {
            self.broadcasts_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.broadcasts_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> RouterMetricsSnapshot {
        RouterMetricsSnapshot {
            forwarded: self.forwarded(),
            loop_dropped: self.loop_dropped.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            send_failed: self.send_failed(),
            broadcasts_delivered: self.broadcasts_delivered.load(Ordering::Relaxed),
            broadcasts_failed: self.broadcasts_failed.load(Ordering::Relaxed),
            broadcasts_duplicate: self.broadcasts_duplicate.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of router metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterMetricsSnapshot {
    pub forwarded: u64,
    pub loop_dropped: u64,
    pub rate_limited: u64,
    pub duplicates: u64,
    pub send_failed: u64,
    pub broadcasts_delivered: u64,
    pub broadcasts_failed: u64,
    pub broadcasts_duplicate: u64,
}

impl RouterMetricsSnapshot {
    /// All drops regardless of reason
    pub fn dropped(&self) -> u64 {
        self.loop_dropped + self.rate_limited + self.duplicates
    }

    /// Inbound messages seen by `on_message`
    pub fn received(&self) -> u64 {
        self.forwarded + self.dropped() + self.send_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::SendFailure;
    use contracts::Platform;

    #[test]
    fn test_record_outcomes() {
        let metrics = RouterMetrics::new();
        metrics.record(&RouteOutcome::Forwarded {
            destination: Platform::Discord,
            target: "chan".to_string(),
        });
        metrics.record(&RouteOutcome::Dropped(DropReason::RateLimited));
        metrics.record(&RouteOutcome::Dropped(DropReason::RateLimited));
        metrics.record(&RouteOutcome::Dropped(DropReason::LoopPrevention));
        metrics.record(&RouteOutcome::SendFailed(SendFailure::Rejected));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.forwarded, 1);
        assert_eq!(snapshot.rate_limited, 2);
        assert_eq!(snapshot.loop_dropped, 1);
        assert_eq!(snapshot.send_failed, 1);
        assert_eq!(snapshot.dropped(), 3);
        assert_eq!(snapshot.received(), 5);
    }

    #[test]
    fn test_broadcast_counters() {
        let metrics = RouterMetrics::new();
        metrics.record_broadcast_delivery(true);
        metrics.record_broadcast_delivery(false);
        metrics.inc_broadcast_duplicate();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.broadcasts_delivered, 1);
        assert_eq!(snapshot.broadcasts_failed, 1);
        assert_eq!(snapshot.broadcasts_duplicate, 1);
        assert_eq!(snapshot.received(), 0);
    }
}
