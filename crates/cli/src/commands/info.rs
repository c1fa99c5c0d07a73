//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{BridgeBlueprint, Platform};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    platforms: Vec<PlatformInfo>,
    rate_limit: RateLimitInfo,
    dedupe: DedupeInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<DigestInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    news: Option<NewsInfo>,
    sweep_interval_sec: u64,
}

#[derive(Serialize)]
struct PlatformInfo {
    name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    max_message_len: usize,
    marker: String,
}

#[derive(Serialize)]
struct RateLimitInfo {
    max_events: usize,
    window_sec: u64,
    penalty_timeout_sec: u64,
}

#[derive(Serialize)]
struct DedupeInfo {
    ttl_sec: u64,
    scope: String,
    sweep_threshold: usize,
}

#[derive(Serialize)]
struct DigestInfo {
    interval_sec: u64,
    send_on_start: bool,
    grace_period_sec: u64,
}

#[derive(Serialize)]
struct NewsInfo {
    feeds: Vec<String>,
    keywords: Vec<String>,
    interval_sec: u64,
    request_timeout_sec: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &BridgeBlueprint) -> ConfigInfo {
    let platforms = Platform::ALL
        .into_iter()
        .map(|platform| {
            let side = blueprint.platform(platform);
            PlatformInfo {
                name: platform.config_key(),
                target: side.resolve_target().map(str::to_string),
                max_message_len: side.effective_max_len(platform),
                marker: side.effective_marker(platform),
            }
        })
        .collect();

    let digest = blueprint.digest.enabled.then(|| DigestInfo {
        interval_sec: blueprint.digest.interval_sec,
        send_on_start: blueprint.digest.send_on_start,
        grace_period_sec: blueprint.digest.grace_period_sec,
    });

    let news = blueprint.news.is_active().then(|| NewsInfo {
        feeds: blueprint.news.feeds.clone(),
        keywords: blueprint.news.keywords.clone(),
        interval_sec: blueprint.news.interval_sec,
        request_timeout_sec: blueprint.news.request_timeout_sec,
    });

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        platforms,
        rate_limit: RateLimitInfo {
            max_events: blueprint.rate_limit.max_events,
            window_sec: blueprint.rate_limit.window_sec,
            penalty_timeout_sec: blueprint.rate_limit.penalty_timeout_sec,
        },
        dedupe: DedupeInfo {
            ttl_sec: blueprint.dedupe.ttl_sec,
            scope: format!("{:?}", blueprint.dedupe.scope),
            sweep_threshold: blueprint.dedupe.sweep_threshold,
        },
        digest,
        news,
        sweep_interval_sec: blueprint.maintenance.sweep_interval_sec,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("Bridge Relay Configuration (version {})", info.version);
    println!("========================================\n");

    println!("Platforms:");
    for platform in &info.platforms {
        println!("  {}", platform.name);
        println!(
            "    Target: {}",
            platform.target.as_deref().unwrap_or("(not configured)")
        );
        println!("    Max length: {}", platform.max_message_len);
        println!("    Marker: {}", platform.marker);
    }
    println!();

    println!("Anti-flood:");
    println!(
        "  {} messages per {}s",
        info.rate_limit.max_events, info.rate_limit.window_sec
    );
    println!("  Penalty timeout: {}s", info.rate_limit.penalty_timeout_sec);
    println!();

    println!("Dedupe:");
    println!("  TTL: {}s", info.dedupe.ttl_sec);
    println!("  Scope: {}", info.dedupe.scope);
    println!("  Sweep threshold: {}", info.dedupe.sweep_threshold);
    println!();

    match info.digest {
        Some(ref digest) => {
            println!("Digest:");
            println!("  Interval: {}s", digest.interval_sec);
            println!("  Send on start: {}", digest.send_on_start);
            println!("  Grace period: {}s", digest.grace_period_sec);
        }
        None => println!("Digest: disabled"),
    }
    println!();

    match info.news {
        Some(ref news) => {
            println!("News:");
            for feed in &news.feeds {
                println!("  Feed: {}", feed);
            }
            if news.keywords.is_empty() {
                println!("  Keywords: (all headlines)");
            } else {
                println!("  Keywords: {}", news.keywords.join(", "));
            }
            println!("  Interval: {}s", news.interval_sec);
            println!("  Request timeout: {}s", news.request_timeout_sec);
        }
        None => println!("News: disabled"),
    }
    println!();

    if info.sweep_interval_sec > 0 {
        println!("Maintenance sweep: every {}s", info.sweep_interval_sec);
    } else {
        println!("Maintenance sweep: disabled");
    }
}
