//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BridgeBlueprint, Platform, MAX_NEWS_FEEDS};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Digest intervals below this are flagged as noisy
const SHORT_DIGEST_INTERVAL_SEC: u64 = 600;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    telegram_target: Option<String>,
    discord_target: Option<String>,
    rate_limit: String,
    dedupe_ttl_sec: u64,
    digest_enabled: bool,
    news_feeds: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    telegram_target: blueprint.telegram.resolve_target().map(str::to_string),
                    discord_target: blueprint.discord.resolve_target().map(str::to_string),
                    rate_limit: format!(
                        "{} per {}s",
                        blueprint.rate_limit.max_events, blueprint.rate_limit.window_sec
                    ),
                    dedupe_ttl_sec: blueprint.dedupe.ttl_sec,
                    digest_enabled: blueprint.digest.enabled,
                    news_feeds: if blueprint.news.enabled {
                        blueprint.news.feeds.len()
                    } else {
                        0
                    },
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BridgeBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    for platform in Platform::ALL {
        if blueprint.platform(platform).resolve_target().is_none() {
            warnings.push(format!(
                "{}: no target or fallback_target - messages to it will fail",
                platform.config_key()
            ));
        }
    }

    if blueprint.maintenance.sweep_interval_sec == 0 {
        warnings.push(
            "maintenance.sweep_interval_sec is 0 - idle senders are only evicted lazily"
                .to_string(),
        );
    }

    if blueprint.digest.enabled && blueprint.digest.interval_sec < SHORT_DIGEST_INTERVAL_SEC {
        warnings.push(format!(
            "digest.interval_sec is {}s - digests will be frequent",
            blueprint.digest.interval_sec
        ));
    }

    if blueprint.news.enabled && blueprint.news.feeds.len() > MAX_NEWS_FEEDS {
        warnings.push(format!(
            "news.feeds lists {} feeds - only the first {MAX_NEWS_FEEDS} are polled",
            blueprint.news.feeds.len()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Telegram target: {}",
                summary.telegram_target.as_deref().unwrap_or("-")
            );
            println!(
                "  Discord target: {}",
                summary.discord_target.as_deref().unwrap_or("-")
            );
            println!("  Rate limit: {}", summary.rate_limit);
            println!("  Dedupe TTL: {}s", summary.dedupe_ttl_sec);
            println!("  Digest: {}", if summary.digest_enabled { "on" } else { "off" });
            if summary.news_feeds > 0 {
                println!("  News feeds: {}", summary.news_feeds);
            } else {
                println!("  News: off");
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
