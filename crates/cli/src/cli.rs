//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Bridge Relay - relays chat between a Telegram chat and a Discord channel
#[derive(Parser, Debug)]
#[command(
    name = "bridge-relay",
    author,
    version,
    about = "Telegram <-> Discord chat bridge relay",
    long_about = "Relays chat messages between Telegram and Discord.\n\n\
                  Drops the bridge's own echoes, throttles flooding senders, \n\
                  suppresses re-posts of syndicated items and broadcasts a \n\
                  periodic stats digest to both platforms."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BRIDGE_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BRIDGE_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay, reading inbound messages as NDJSON
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone, Default)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "bridge.toml",
        env = "BRIDGE_RELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Read inbound messages from this NDJSON file instead of stdin
    #[arg(short, long, env = "BRIDGE_RELAY_INPUT")]
    pub input: Option<PathBuf>,

    /// Override rate_limit.max_events
    #[arg(long, env = "SPAM_MAX_MSGS")]
    pub max_events: Option<usize>,

    /// Override rate_limit.window_sec
    #[arg(long, env = "SPAM_WINDOW_SEC")]
    pub window_sec: Option<u64>,

    /// Override the Telegram bridge chat id
    #[arg(long, env = "BRIDGE_TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Override the Discord bridge channel id
    #[arg(long, env = "BRIDGE_DISCORD_CHANNEL_ID")]
    pub discord_channel_id: Option<String>,

    /// Enable the stats digest regardless of configuration
    #[arg(long)]
    pub digest: bool,

    /// Override digest.interval_sec
    #[arg(long, env = "BRIDGE_DIGEST_INTERVAL_SEC")]
    pub digest_interval: Option<u64>,

    /// News feed URLs, comma separated (enables news syndication)
    #[arg(long, env = "NEWS_FEEDS", value_delimiter = ',')]
    pub news_feeds: Vec<String>,

    /// Headline keywords, comma separated (empty = every headline)
    #[arg(long, env = "NEWS_KEYWORDS", value_delimiter = ',')]
    pub news_keywords: Vec<String>,

    /// Stop after this many inbound messages (0 = unlimited)
    #[arg(long, default_value = "0", env = "BRIDGE_RELAY_MAX_MESSAGES")]
    pub max_messages: u64,

    /// Validate configuration and exit without running the relay
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BRIDGE_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
