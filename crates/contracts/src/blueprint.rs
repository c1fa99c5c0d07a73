//! BridgeBlueprint - Config Loader output
//!
//! Describes the complete bridge configuration: per-platform settings,
//! anti-flood limits, dedupe retention and scheduled jobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Platform;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration blueprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Telegram side
    #[serde(default)]
    pub telegram: PlatformConfig,

    /// Discord side
    #[serde(default)]
    pub discord: PlatformConfig,

    /// Anti-flood settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Syndicated content dedupe settings
    #[serde(default)]
    pub dedupe: DedupeConfig,

    /// Periodic stats digest broadcast
    #[serde(default)]
    pub digest: DigestConfig,

    /// Housekeeping of limiter/cache state
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// RSS/Atom news syndication
    #[serde(default)]
    pub news: NewsConfig,
}

impl BridgeBlueprint {
    /// Settings of one side
    pub fn platform(&self, platform: Platform) -> &PlatformConfig {
        match platform {
            Platform::Telegram => &self.telegram,
            Platform::Discord => &self.discord,
        }
    }

    /// Mutable settings of one side (CLI overrides)
    pub fn platform_mut(&mut self, platform: Platform) -> &mut PlatformConfig {
        match platform {
            Platform::Telegram => &mut self.telegram,
            Platform::Discord => &mut self.discord,
        }
    }
}

/// Settings for one side of the bridge
///
/// `target` and `max_message_len` apply to messages delivered *into* this
/// platform; `marker` tags messages relayed *from* it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Bridge chat / channel id
    #[serde(default)]
    pub target: Option<String>,

    /// Used when `target` is unset (e.g. the admin chat)
    #[serde(default)]
    pub fallback_target: Option<String>,

    /// Platform message length limit in characters (None = platform default)
    #[serde(default)]
    pub max_message_len: Option<usize>,

    /// Marker prefixed to messages relayed *from* this platform (None = platform default)
    #[serde(default)]
    pub marker: Option<String>,
}

impl PlatformConfig {
    /// Target id, falling back to `fallback_target`
    pub fn resolve_target(&self) -> Option<&str> {
        non_blank(&self.target).or_else(|| non_blank(&self.fallback_target))
    }

    /// Effective length limit when this side is `platform`
    pub fn effective_max_len(&self, platform: Platform) -> usize {
        self.max_message_len
            .unwrap_or_else(|| default_max_message_len(platform))
    }

    /// Effective marker when this side is `platform`
    pub fn effective_marker(&self, platform: Platform) -> String {
        self.marker
            .clone()
            .unwrap_or_else(|| platform.default_marker().to_string())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Default outbound length budget per platform
///
/// Kept below the hard API limits (Telegram 4096, Discord 2000).
pub fn default_max_message_len(platform: Platform) -> usize {
    match platform {
        Platform::Telegram => 4000,
        Platform::Discord => 1900,
    }
}

/// Sliding-window anti-flood configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Events allowed inside the window
    #[serde(default = "default_max_events")]
    pub max_events: usize,

    /// Window length in seconds
    #[serde(default = "default_window_sec")]
    pub window_sec: u64,

    /// Timeout handed to the penalty hook when a sender is throttled
    #[serde(default = "default_penalty_timeout_sec")]
    pub penalty_timeout_sec: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_sec)
    }

    pub fn penalty_timeout(&self) -> Duration {
        Duration::from_secs(self.penalty_timeout_sec)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            window_sec: default_window_sec(),
            penalty_timeout_sec: default_penalty_timeout_sec(),
        }
    }
}

fn default_max_events() -> usize {
    5
}

fn default_window_sec() -> u64 {
    8
}

fn default_penalty_timeout_sec() -> u64 {
    300
}

/// Where a fingerprint is considered "already posted"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupeScope {
    /// One shared key per fingerprint
    #[default]
    Global,
    /// Key prefixed with the destination target
    PerDestination,
}

/// Syndicated content dedupe configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeConfig {
    /// Retention in seconds
    #[serde(default = "default_ttl_sec")]
    pub ttl_sec: u64,

    /// Dedupe key scope
    #[serde(default)]
    pub scope: DedupeScope,

    /// Entry count above which inserts trigger an opportunistic sweep
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
}

impl DedupeConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_sec)
    }
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            ttl_sec: default_ttl_sec(),
            scope: DedupeScope::default(),
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

fn default_ttl_sec() -> u64 {
    6 * 60 * 60
}

fn default_sweep_threshold() -> usize {
    10_000
}

/// Periodic stats digest posted to both platforms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_digest_interval_sec")]
    pub interval_sec: u64,

    /// Post once immediately on start
    #[serde(default)]
    pub send_on_start: bool,

    /// How long `stop()` waits for an in-flight post
    #[serde(default = "default_grace_period_sec")]
    pub grace_period_sec: u64,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_sec: default_digest_interval_sec(),
            send_on_start: false,
            grace_period_sec: default_grace_period_sec(),
        }
    }
}

fn default_digest_interval_sec() -> u64 {
    60 * 60
}

fn default_grace_period_sec() -> u64 {
    10
}

/// Housekeeping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Interval of the limiter/cache sweep (0 = disabled)
    #[serde(default = "default_sweep_interval_sec")]
    pub sweep_interval_sec: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_interval_sec: default_sweep_interval_sec(),
        }
    }
}

fn default_sweep_interval_sec() -> u64 {
    300
}

/// Feeds polled at most once per cycle
pub const MAX_NEWS_FEEDS: usize = 10;

/// RSS/Atom news syndication
///
/// Each cycle polls `feeds` in order and broadcasts the first new headline
/// that matches `keywords` (empty = everything).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Feed URLs; only the first [`MAX_NEWS_FEEDS`] are polled
    #[serde(default)]
    pub feeds: Vec<String>,

    /// Case-insensitive title keywords
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default = "default_news_interval_sec")]
    pub interval_sec: u64,

    /// Per-feed HTTP timeout
    #[serde(default = "default_news_request_timeout_sec")]
    pub request_timeout_sec: u64,
}

impl NewsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_sec)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }

    /// Enabled with at least one feed
    pub fn is_active(&self) -> bool {
        self.enabled && self.feeds.iter().any(|f| !f.trim().is_empty())
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feeds: Vec::new(),
            keywords: Vec::new(),
            interval_sec: default_news_interval_sec(),
            request_timeout_sec: default_news_request_timeout_sec(),
        }
    }
}

fn default_news_interval_sec() -> u64 {
    10 * 60
}

fn default_news_request_timeout_sec() -> u64 {
    20
}
