//! Relay run statistics.

use std::time::Duration;

use observability::RunningStats;
use router::{RouteOutcome, RouterMetricsSnapshot};

/// Scheduler counters at shutdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStats {
    pub name: String,
    pub ticks: u64,
    pub failures: u64,
}

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Input lines parsed into messages
    pub messages_read: u64,

    /// Input lines that failed to parse
    pub malformed_lines: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Router counters at shutdown
    pub router: RouterMetricsSnapshot,

    /// Per-message routing latency
    pub route_latency_ms: RunningStats,

    /// Scheduled jobs
    pub jobs: Vec<JobStats>,
}

impl RelayStats {
    /// Account one routed message
    pub fn record(&mut self, outcome: &RouteOutcome, elapsed: Duration) {
        self.messages_read += 1;
        self.route_latency_ms.push(elapsed.as_secs_f64() * 1000.0);
        tracing::trace!(outcome = outcome.label(), reason = outcome.reason(), "Routed");
    }

    /// Messages per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.messages_read as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of inbound messages that were relayed, in percent
    pub fn forward_rate(&self) -> f64 {
        let received = self.router.received();
        if received > 0 {
            (self.router.forwarded as f64 / received as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Bridge Relay Statistics                   ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Messages read: {}", self.messages_read);
        println!("   ├─ Malformed lines: {}", self.malformed_lines);
        println!("   ├─ Throughput: {:.2} msg/s", self.throughput());
        println!("   └─ Route latency (ms): {}", self.route_latency_ms.summary());

        let r = &self.router;
        println!("\n📨 Routing");
        println!("   ├─ Forwarded: {} ({:.2}%)", r.forwarded, self.forward_rate());
        println!("   ├─ Dropped (echo): {}", r.loop_dropped);
        println!("   ├─ Dropped (flood): {}", r.rate_limited);
        println!("   ├─ Dropped (duplicate): {}", r.duplicates);
        println!("   └─ Send failed: {}", r.send_failed);

        println!("\n📢 Broadcasts");
        println!("   ├─ Delivered: {}", r.broadcasts_delivered);
        println!("   ├─ Failed: {}", r.broadcasts_failed);
        println!("   └─ Duplicate: {}", r.broadcasts_duplicate);

        if !self.jobs.is_empty() {
            println!("\n⏱  Scheduled Jobs");
            for (i, job) in self.jobs.iter().enumerate() {
                let prefix = if i == self.jobs.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} ticks, {} failed",
                    prefix, job.name, job.ticks, job.failures
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let stats = RelayStats {
            messages_read: 10,
            duration: Duration::from_secs(5),
            router: RouterMetricsSnapshot {
                forwarded: 6,
                rate_limited: 2,
                loop_dropped: 2,
                ..Default::default()
            },
            ..Default::default()
        };

        assert!((stats.throughput() - 2.0).abs() < 1e-10);
        assert!((stats.forward_rate() - 60.0).abs() < 1e-10);
    }

    #[test]
    fn test_empty_run() {
        let stats = RelayStats::default();
        assert_eq!(stats.throughput(), 0.0);
        assert_eq!(stats.forward_rate(), 0.0);
    }
}
