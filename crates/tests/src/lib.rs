//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 跨 crate 场景：配置 -> 路由器 -> sink，调度器 -> 广播

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
        let _ = contracts::DedupeScope::Global;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BridgeBlueprint, BridgeMessage, Identity, Platform};
    use router::{
        BridgeRouter, BroadcastPost, ChannelSink, DropReason, OutboundMessage, RouteOutcome,
    };
    use scheduler::{PeriodicScheduler, SchedulerConfig};
    use throttle::{DedupeCache, RateLimiter};
    use tokio::sync::mpsc;

    const BRIDGE_TOML: &str = r#"
[telegram]
target = "-100123"

[discord]
target = "987654"
max_message_len = 40

[rate_limit]
max_events = 5
window_sec = 8

[dedupe]
ttl_sec = 21600
"#;

    struct Harness {
        router: Arc<BridgeRouter>,
        telegram_rx: mpsc::Receiver<OutboundMessage>,
        discord_rx: mpsc::Receiver<OutboundMessage>,
    }

    fn harness(blueprint: &BridgeBlueprint) -> Harness {
        let (telegram, telegram_rx) = ChannelSink::new("telegram", 16);
        let (discord, discord_rx) = ChannelSink::new("discord", 16);
        let router = BridgeRouter::builder(blueprint)
            .sink(Platform::Telegram, telegram)
            .sink(Platform::Discord, discord)
            .build()
            .unwrap();

        Harness {
            router: Arc::new(router),
            telegram_rx,
            discord_rx,
        }
    }

    fn bridge_blueprint() -> BridgeBlueprint {
        ConfigLoader::load_from_str(BRIDGE_TOML, ConfigFormat::Toml).unwrap()
    }

    /// Config file -> router -> channel sink of the opposite platform
    #[tokio::test]
    async fn test_config_to_router_forwarding() {
        let mut h = harness(&bridge_blueprint());

        let msg = BridgeMessage::new(Platform::Telegram, "42", "alice", "hello from tg");
        let outcome = h.router.on_message(&msg).await;
        assert_eq!(
            outcome,
            RouteOutcome::Forwarded {
                destination: Platform::Discord,
                target: "987654".to_string(),
            }
        );

        let sent = h.discord_rx.recv().await.unwrap();
        assert_eq!(sent.target, "987654");
        assert_eq!(sent.text, "📨 TG | alice: hello from tg");
        assert!(h.telegram_rx.try_recv().is_err());
    }

    /// Six messages inside one second, then one more nine seconds later
    #[test]
    fn test_flood_scenario_limiter() {
        let limiter = RateLimiter::new(5, Duration::from_secs(8)).unwrap();
        let u1 = Identity::from("u1");
        let t0 = Instant::now();

        for i in 0..5 {
            let now = t0 + Duration::from_millis(i * 200);
            assert!(!limiter.record_and_check(&u1, now), "call {} limited", i + 1);
        }
        assert!(limiter.record_and_check(&u1, t0 + Duration::from_millis(999)));
        assert!(!limiter.record_and_check(&u1, t0 + Duration::from_secs(9)));
    }

    #[tokio::test]
    async fn test_flood_scenario_through_router() {
        let mut h = harness(&bridge_blueprint());
        let t0 = Instant::now();

        let mut outcomes = Vec::new();
        for i in 0..6 {
            let msg = BridgeMessage::new(Platform::Telegram, "u1", "spammer", format!("msg {i}"));
            outcomes.push(
                h.router
                    .on_message_at(&msg, t0 + Duration::from_millis(i * 150))
                    .await,
            );
        }

        assert!(outcomes[..5].iter().all(RouteOutcome::is_forwarded));
        assert_eq!(outcomes[5], RouteOutcome::Dropped(DropReason::RateLimited));

        // Another sender is unaffected
        let other = BridgeMessage::new(Platform::Telegram, "u2", "bob", "hi");
        assert!(h.router.on_message_at(&other, t0).await.is_forwarded());

        let mut delivered = 0;
        while h.discord_rx.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, 6);

        let snapshot = h.router.metrics().snapshot();
        assert_eq!(snapshot.forwarded, 6);
        assert_eq!(snapshot.rate_limited, 1);
    }

    /// Same syndicated item twice, ten seconds apart
    #[tokio::test]
    async fn test_dedupe_scenario() {
        let mut h = harness(&bridge_blueprint());
        let t0 = Instant::now();

        let first = BridgeMessage::new(Platform::Discord, "feed", "YouTube", "New upload")
            .with_syndication("yt", "abc123");
        let second = BridgeMessage::new(Platform::Discord, "feed-2", "YouTube", "Same upload")
            .with_syndication("yt", "abc123");

        assert!(h.router.on_message_at(&first, t0).await.is_forwarded());
        assert_eq!(
            h.router
                .on_message_at(&second, t0 + Duration::from_secs(10))
                .await,
            RouteOutcome::Dropped(DropReason::Duplicate)
        );

        assert!(h.telegram_rx.try_recv().is_ok());
        assert!(h.telegram_rx.try_recv().is_err());
    }

    #[test]
    fn test_dedupe_expiry_window() {
        let cache = DedupeCache::new(Duration::from_secs(21600)).unwrap();
        let t0 = Instant::now();

        assert!(!cache.seen_or_record("yt:abc123", t0));
        assert!(cache.seen_or_record("yt:abc123", t0 + Duration::from_secs(21599)));
        assert!(!cache.seen_or_record("yt:abc123", t0 + Duration::from_secs(21601)));
    }

    /// Relayed text coming back is dropped even for a throttled sender
    #[tokio::test]
    async fn test_loop_prevention_ignores_rate_state() {
        let mut h = harness(&bridge_blueprint());
        let t0 = Instant::now();

        for i in 0..6 {
            let msg = BridgeMessage::new(Platform::Discord, "bot", "relay", format!("noise {i}"));
            h.router.on_message_at(&msg, t0).await;
        }

        let echo = BridgeMessage::new(Platform::Discord, "bot", "relay", "📨 TG | alice: hi");
        assert_eq!(
            h.router.on_message_at(&echo, t0).await,
            RouteOutcome::Dropped(DropReason::LoopPrevention)
        );

        let echo = BridgeMessage::new(Platform::Telegram, "bot", "relay", "💬 Discord | x: y");
        assert_eq!(
            h.router.on_message_at(&echo, t0).await,
            RouteOutcome::Dropped(DropReason::LoopPrevention)
        );

        // Only the five non-throttled noise messages reached Telegram
        let mut delivered = 0;
        while h.telegram_rx.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, 5);
        assert!(h.discord_rx.try_recv().is_err());
    }

    /// Over-long bodies are cut to the destination budget, prefix included
    #[tokio::test]
    async fn test_truncation_to_destination_limit() {
        let mut h = harness(&bridge_blueprint());

        let body = "ä".repeat(100);
        let msg = BridgeMessage::new(Platform::Telegram, "42", "alice", body);
        assert!(h.router.on_message(&msg).await.is_forwarded());

        let sent = h.discord_rx.recv().await.unwrap();
        assert_eq!(sent.text.chars().count(), 40);
        assert!(sent.text.starts_with("📨 TG | alice: ä"));
    }

    /// interval 1s without send_on_start, stopped at t=1.5s
    #[tokio::test(start_paused = true)]
    async fn test_scheduler_stop_mid_wait() {
        let fired = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&fired);

        let job = PeriodicScheduler::new("heartbeat", SchedulerConfig::from_secs(1).unwrap(), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        job.start();

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        job.stop().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(job.tick_count(), 1);
    }

    /// Scheduled digest reaches both platforms, a failing tick does not stop the job
    #[tokio::test(start_paused = true)]
    async fn test_scheduled_broadcast_via_channel_sinks() {
        let mut h = harness(&bridge_blueprint());
        let router = Arc::clone(&h.router);
        let round = Arc::new(AtomicU64::new(0));

        let config = SchedulerConfig::from_secs(1).unwrap().with_send_on_start(true);
        let job = PeriodicScheduler::new("digest", config, move || {
            let router = Arc::clone(&router);
            let round = Arc::clone(&round);
            async move {
                let n = round.fetch_add(1, Ordering::SeqCst);
                if n == 1 {
                    anyhow::bail!("digest source unavailable");
                }
                router.broadcast(&BroadcastPost::new(format!("digest #{n}"))).await;
                Ok(())
            }
        });
        job.start();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        job.stop().await;

        assert_eq!(job.tick_count(), 3);
        assert_eq!(job.failure_count(), 1);

        let tg: Vec<String> = std::iter::from_fn(|| h.telegram_rx.try_recv().ok())
            .map(|m| m.text)
            .collect();
        let dc: Vec<String> = std::iter::from_fn(|| h.discord_rx.try_recv().ok())
            .map(|m| m.text)
            .collect();
        assert_eq!(tg, vec!["digest #0", "digest #2"]);
        assert_eq!(dc, tg);
        assert_eq!(h.router.metrics().snapshot().broadcasts_delivered, 4);
    }

    /// Fingerprinted broadcast is posted once
    #[tokio::test]
    async fn test_fingerprinted_broadcast_deduped() {
        let mut h = harness(&bridge_blueprint());
        let post = BroadcastPost::new("New video: https://youtu.be/abc123")
            .with_fingerprint(contracts::Fingerprint::new("yt", "abc123"));

        assert!(h.router.broadcast(&post).await.is_complete());
        let again = h.router.broadcast(&post).await;
        assert_eq!(again.delivered_count(), 0);

        assert!(h.telegram_rx.try_recv().is_ok());
        assert!(h.telegram_rx.try_recv().is_err());
        assert!(h.discord_rx.try_recv().is_ok());
        assert!(h.discord_rx.try_recv().is_err());
    }

    /// Sweep after the window releases idle identities and expired keys
    #[tokio::test]
    async fn test_sweep_releases_state() {
        let h = harness(&bridge_blueprint());
        let t0 = Instant::now();

        let msg = BridgeMessage::new(Platform::Telegram, "42", "alice", "clip")
            .with_syndication("yt", "zzz");
        h.router.on_message_at(&msg, t0).await;

        let report = h.router.sweep(t0 + Duration::from_secs(9));
        assert_eq!(report.identities_evicted, 1);
        assert_eq!(report.dedupe_evicted, 0);

        let report = h.router.sweep(t0 + Duration::from_secs(21601));
        assert_eq!(report.dedupe_evicted, 1);
        assert_eq!(report.dedupe_tracked, 0);
    }
}
