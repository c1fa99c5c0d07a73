//! Relay orchestrator - wires router, schedulers and the input listener.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use contracts::{BridgeBlueprint, Platform};
use feed::{format_post, FeedWatcher};
use router::{BridgeRouter, BroadcastOutcome, BroadcastPost, LogPenaltyHook, LogSink};
use scheduler::{PeriodicScheduler, SchedulerConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::digest::build_digest;
use super::listener::parse_line;
use super::stats::{JobStats, RelayStats};
use crate::error::CliError;

/// Relay configuration
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// Validated bridge configuration
    pub blueprint: BridgeBlueprint,

    /// NDJSON input file (None = stdin)
    pub input: Option<PathBuf>,

    /// Stop after this many messages (None = unlimited)
    pub max_messages: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    /// Create a new relay with the given configuration
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Run until the input ends or `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<RelayStats>
    where
        F: Future<Output = ()>,
    {
        match self.config.input.clone() {
            Some(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|e| CliError::input_open(&path, e))?;
                info!(input = %path.display(), "Reading messages from file");
                self.run_with_reader(BufReader::new(file), shutdown).await
            }
            None => {
                info!("Reading messages from stdin");
                self.run_with_reader(BufReader::new(tokio::io::stdin()), shutdown)
                    .await
            }
        }
    }

    /// Run against any line-oriented reader
    pub async fn run_with_reader<R, F>(self, reader: R, shutdown: F) -> Result<RelayStats>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let router = Arc::new(build_router(blueprint)?);
        let jobs = start_jobs(blueprint, &router)?;

        let mut stats = RelayStats::default();
        let mut lines = reader.lines();
        let mut line_no: u64 = 0;
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read inbound message")?,
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping relay...");
                    break;
                }
            };

            let Some(line) = line else {
                info!(lines = line_no, "Input closed");
                break;
            };
            line_no += 1;

            match parse_line(&line) {
                Ok(Some(message)) => {
                    let started = Instant::now();
                    let outcome = router.on_message(&message).await;
                    stats.record(&outcome, started.elapsed());
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(line = line_no, error = %e, "Skipping malformed input line");
                    stats.malformed_lines += 1;
                }
            }

            if let Some(max) = self.config.max_messages {
                if stats.messages_read >= max {
                    info!(max_messages = max, "Message limit reached");
                    break;
                }
            }

            if stats.messages_read > 0 && stats.messages_read.is_multiple_of(100) {
                debug!(messages = stats.messages_read, "Relay progress");
            }
        }

        for job in &jobs {
            job.stop().await;
            stats.jobs.push(JobStats {
                name: job.name().to_string(),
                ticks: job.tick_count(),
                failures: job.failure_count(),
            });
        }

        stats.router = router.metrics().snapshot();
        stats.duration = start_time.elapsed();

        info!(
            messages = stats.messages_read,
            forwarded = stats.router.forwarded,
            dropped = stats.router.dropped(),
            send_failed = stats.router.send_failed,
            "Relay shutdown complete"
        );

        Ok(stats)
    }
}

/// Router over log sinks; the real platform clients plug in here
fn build_router(blueprint: &BridgeBlueprint) -> Result<BridgeRouter> {
    BridgeRouter::builder(blueprint)
        .sink(Platform::Telegram, LogSink::new("telegram"))
        .sink(Platform::Discord, LogSink::new("discord"))
        .penalty_hook(LogPenaltyHook)
        .build()
        .context("Failed to build router")
}

/// Create and start the maintenance sweep, the stats digest and the news feed
fn start_jobs(
    blueprint: &BridgeBlueprint,
    router: &Arc<BridgeRouter>,
) -> Result<Vec<PeriodicScheduler>> {
    let mut jobs = Vec::new();

    let sweep_interval = blueprint.maintenance.sweep_interval_sec;
    if sweep_interval > 0 {
        let config = SchedulerConfig::from_secs(sweep_interval)
            .context("Invalid maintenance.sweep_interval_sec")?;
        let router = Arc::clone(router);

        jobs.push(PeriodicScheduler::new("maintenance_sweep", config, move || {
            let router = Arc::clone(&router);
            async move {
                let report = router.sweep_now();
                debug!(evicted = report.total_evicted(), "Maintenance sweep");
                Ok(())
            }
        }));
    } else {
        info!("Maintenance sweep disabled");
    }

    let digest = &blueprint.digest;
    if digest.enabled {
        let config = SchedulerConfig::from_secs(digest.interval_sec)
            .context("Invalid digest.interval_sec")?
            .with_send_on_start(digest.send_on_start)
            .with_grace_period(Duration::from_secs(digest.grace_period_sec));
        let router = Arc::clone(router);

        jobs.push(PeriodicScheduler::new("stats_digest", config, move || {
            let router = Arc::clone(&router);
            async move {
                let text = build_digest(&router.metrics().snapshot(), &Local::now());
                let outcome = router.broadcast(&BroadcastPost::new(text)).await;
                ensure_delivered("digest", &outcome)
            }
        }));
    }

    let news = &blueprint.news;
    if news.is_active() {
        // First tick primes the watcher with the current headlines
        let config = SchedulerConfig::from_secs(news.interval_sec)
            .context("Invalid news.interval_sec")?
            .with_send_on_start(true)
            .with_grace_period(news.request_timeout());
        let watcher = Arc::new(FeedWatcher::new(news).context("Failed to create news watcher")?);
        let router = Arc::clone(router);
        info!(feeds = watcher.feeds().len(), "News syndication enabled");

        jobs.push(PeriodicScheduler::new("news_feed", config, move || {
            let watcher = Arc::clone(&watcher);
            let router = Arc::clone(&router);
            async move {
                let Some(item) = watcher.poll().await else {
                    return Ok(());
                };
                let post = BroadcastPost::new(format_post(&item)).with_fingerprint(item.fingerprint());
                let outcome = router.broadcast(&post).await;
                if outcome.duplicate {
                    debug!(link = %item.link, "Headline already posted");
                    return Ok(());
                }
                ensure_delivered("news post", &outcome)
            }
        }));
    }

    for job in &jobs {
        job.start();
    }
    Ok(jobs)
}

/// Fail the tick unless the post reached both platforms
fn ensure_delivered(what: &str, outcome: &BroadcastOutcome) -> Result<()> {
    if outcome.is_complete() {
        return Ok(());
    }
    let failed: Vec<String> = outcome
        .failures()
        .map(|(platform, failure)| format!("{platform}: {failure}"))
        .collect();
    Err(anyhow::anyhow!(
        "{what} not delivered everywhere ({})",
        failed.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay_config() -> RelayConfig {
        let mut blueprint = BridgeBlueprint::default();
        blueprint.telegram.target = Some("-100tg".to_string());
        blueprint.discord.target = Some("chan-dc".to_string());
        RelayConfig {
            blueprint,
            ..Default::default()
        }
    }

    const INPUT: &str = r#"
{"platform":"telegram","author_id":"1","author":"alice","text":"hi discord"}
{"platform":"discord","author_id":"2","author":"bob","text":"hi telegram"}
{"platform":"telegram","author_id":"bot","author":"relay","text":"💬 Discord | bob: hi telegram"}
not json at all
{"platform":"discord","author_id":"feed","author":"YouTube","text":"New video","syndication":{"source":"yt","item_id":"abc123"}}
{"platform":"discord","author_id":"feed","author":"YouTube","text":"New video","syndication":{"source":"yt","item_id":"abc123"}}
"#;

    #[tokio::test]
    async fn test_relay_processes_input_until_eof() {
        let relay = Relay::new(relay_config());
        let stats = relay
            .run_with_reader(INPUT.as_bytes(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.messages_read, 5);
        assert_eq!(stats.malformed_lines, 1);
        assert_eq!(stats.router.forwarded, 3);
        assert_eq!(stats.router.loop_dropped, 1);
        assert_eq!(stats.router.duplicates, 1);
        assert_eq!(stats.route_latency_ms.count(), 5);

        assert_eq!(stats.jobs.len(), 1);
        assert_eq!(stats.jobs[0].name, "maintenance_sweep");
    }

    #[tokio::test]
    async fn test_relay_stops_at_message_limit() {
        let config = RelayConfig {
            max_messages: Some(2),
            ..relay_config()
        };
        let stats = Relay::new(config)
            .run_with_reader(INPUT.as_bytes(), std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.messages_read, 2);
        assert_eq!(stats.router.forwarded, 2);
    }

    #[tokio::test]
    async fn test_relay_stops_on_shutdown_signal() {
        // Writer half kept alive so reads never reach EOF
        let (_writer, reader) = tokio::io::duplex(64);
        let stats = Relay::new(relay_config())
            .run_with_reader(BufReader::new(reader), std::future::ready(()))
            .await
            .unwrap();

        assert_eq!(stats.messages_read, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_digest_sent_on_start_reaches_both_platforms() {
        let mut config = relay_config();
        config.blueprint.digest.enabled = true;
        config.blueprint.digest.send_on_start = true;
        config.blueprint.maintenance.sweep_interval_sec = 0;

        // Input stays open until shutdown, well before the next digest
        let (_writer, reader) = tokio::io::duplex(64);
        let stats = Relay::new(config)
            .run_with_reader(
                BufReader::new(reader),
                tokio::time::sleep(Duration::from_secs(5)),
            )
            .await
            .unwrap();

        assert_eq!(stats.jobs.len(), 1);
        assert_eq!(stats.jobs[0].name, "stats_digest");
        assert_eq!(stats.jobs[0].ticks, 1);
        assert_eq!(stats.router.broadcasts_delivered, 2);
    }

    /// Serve each RSS body once, in order
    async fn serve_rss(bodies: Vec<String>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for body in bodies {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = vec![0u8; 4096];
                let _ = socket.read(&mut request).await.unwrap();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
        });
        format!("http://{addr}/rss")
    }

    fn rss(title: &str, link: &str) -> String {
        format!("<rss><channel><item><title>{title}</title><link>{link}</link></item></channel></rss>")
    }

    #[tokio::test]
    async fn test_news_job_primes_then_broadcasts_new_headline() {
        let url = serve_rss(vec![
            rss("CS2 update", "https://news.example/1"),
            rss("CS2 hotfix", "https://news.example/2"),
        ])
        .await;

        let mut config = relay_config();
        config.blueprint.maintenance.sweep_interval_sec = 0;
        config.blueprint.news.enabled = true;
        config.blueprint.news.feeds = vec![url];
        config.blueprint.news.interval_sec = 1;

        let (_writer, reader) = tokio::io::duplex(64);
        let stats = Relay::new(config)
            .run_with_reader(
                BufReader::new(reader),
                tokio::time::sleep(Duration::from_millis(1500)),
            )
            .await
            .unwrap();

        assert_eq!(stats.jobs.len(), 1);
        assert_eq!(stats.jobs[0].name, "news_feed");
        assert_eq!(stats.jobs[0].ticks, 2);
        assert_eq!(stats.jobs[0].failures, 0);
        assert_eq!(stats.router.broadcasts_delivered, 2);
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let config = RelayConfig {
            input: Some(PathBuf::from("/nonexistent/bridge-input.ndjson")),
            ..relay_config()
        };
        let err = Relay::new(config)
            .run(std::future::pending())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to open input"));
    }
}
