//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::BridgeBlueprint;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Relay, RelayConfig};

/// Execute the `run` command
pub async fn run_relay(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI / environment overrides, then re-check
    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        telegram_target = ?blueprint.telegram.resolve_target(),
        discord_target = ?blueprint.discord.resolve_target(),
        max_events = blueprint.rate_limit.max_events,
        window_sec = blueprint.rate_limit.window_sec,
        dedupe_ttl_sec = blueprint.dedupe.ttl_sec,
        digest = blueprint.digest.enabled,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let relay_config = RelayConfig {
        blueprint,
        input: args.input.clone(),
        max_messages: if args.max_messages == 0 {
            None
        } else {
            Some(args.max_messages)
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting relay...");

    let stats = Relay::new(relay_config)
        .run(shutdown_signal())
        .await
        .context("Relay execution failed")?;

    info!(
        messages = stats.messages_read,
        forwarded = stats.router.forwarded,
        duration_secs = stats.duration.as_secs_f64(),
        throughput = format!("{:.2}", stats.throughput()),
        "Relay completed"
    );
    stats.print_summary();

    info!("Bridge relay finished");
    Ok(())
}

/// Overlay command-line / environment values on the file configuration
fn apply_overrides(blueprint: &mut BridgeBlueprint, args: &RunArgs) {
    if let Some(max_events) = args.max_events {
        info!(max_events, "Overriding rate_limit.max_events");
        blueprint.rate_limit.max_events = max_events;
    }
    if let Some(window_sec) = args.window_sec {
        info!(window_sec, "Overriding rate_limit.window_sec");
        blueprint.rate_limit.window_sec = window_sec;
    }
    if let Some(ref chat_id) = args.telegram_chat_id {
        info!(chat_id = %chat_id, "Overriding telegram.target");
        blueprint.telegram.target = Some(chat_id.clone());
    }
    if let Some(ref channel_id) = args.discord_channel_id {
        info!(channel_id = %channel_id, "Overriding discord.target");
        blueprint.discord.target = Some(channel_id.clone());
    }
    if args.digest {
        blueprint.digest.enabled = true;
    }
    if let Some(interval) = args.digest_interval {
        info!(interval, "Overriding digest.interval_sec");
        blueprint.digest.interval_sec = interval;
    }

    let feeds = non_blank(&args.news_feeds);
    if !feeds.is_empty() {
        info!(feeds = feeds.len(), "Overriding news.feeds");
        blueprint.news.enabled = true;
        blueprint.news.feeds = feeds;
    }
    let keywords = non_blank(&args.news_keywords);
    if !keywords.is_empty() {
        info!(keywords = ?keywords, "Overriding news.keywords");
        blueprint.news.keywords = keywords;
    }
}

/// `NEWS_FEEDS=""` yields one empty value
fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &BridgeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    for platform in contracts::Platform::ALL {
        let side = blueprint.platform(platform);
        println!("{}:", platform.config_key());
        println!(
            "  Target: {}",
            side.resolve_target().unwrap_or("(not configured)")
        );
        println!("  Max length: {}", side.effective_max_len(platform));
        println!("  Marker: {}", side.effective_marker(platform));
    }

    println!("\nAnti-flood:");
    println!(
        "  {} messages per {}s, penalty {}s",
        blueprint.rate_limit.max_events,
        blueprint.rate_limit.window_sec,
        blueprint.rate_limit.penalty_timeout_sec
    );
    println!(
        "\nDedupe: ttl {}s ({:?})",
        blueprint.dedupe.ttl_sec, blueprint.dedupe.scope
    );

    if blueprint.digest.enabled {
        println!("\nDigest: every {}s", blueprint.digest.interval_sec);
    }
    if blueprint.news.is_active() {
        println!(
            "News: {} feed(s) every {}s",
            blueprint.news.feeds.len(),
            blueprint.news.interval_sec
        );
    }

    println!();
}
