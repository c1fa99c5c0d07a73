//! BridgeMessage - listener output, router input
//!
//! Platform tags, sender identities and content fingerprints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat platform on either side of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Telegram,
    Discord,
}

impl Platform {
    /// Both bridged platforms
    pub const ALL: [Platform; 2] = [Platform::Telegram, Platform::Discord];

    /// Short tag used in identities, logs and metric labels
    pub fn tag(self) -> &'static str {
        match self {
            Platform::Telegram => "tg",
            Platform::Discord => "discord",
        }
    }

    /// Configuration section name (`[telegram]`, `[discord]`)
    pub fn config_key(self) -> &'static str {
        match self {
            Platform::Telegram => "telegram",
            Platform::Discord => "discord",
        }
    }

    /// The platform on the other side of the bridge
    pub fn opposite(self) -> Self {
        match self {
            Platform::Telegram => Platform::Discord,
            Platform::Discord => Platform::Telegram,
        }
    }

    /// Prefix put in front of messages relayed *from* this platform
    pub fn default_marker(self) -> &'static str {
        match self {
            Platform::Telegram => "📨 TG",
            Platform::Discord => "💬 Discord",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Sender identity for rate limiting
///
/// Opaque to the limiter. [`Identity::scoped`] namespaces a raw platform
/// user id by platform tag so equal ids on both sides never share a window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Identity for a raw user id on a given platform (`"tg:42"`)
    pub fn scoped(platform: Platform, raw_id: &str) -> Self {
        Self(format!("{}:{}", platform.tag(), raw_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable content key for deduplication: `"<source-tag>:<source-item-id>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(source: &str, item_id: &str) -> Self {
        Self(format!("{source}:{item_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an externally sourced item (video, feed post, stream)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Syndication {
    /// Source tag (e.g. "yt", "twitch", "news")
    pub source: String,
    /// Item id within the source
    pub item_id: String,
}

impl Syndication {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(&self.source, &self.item_id)
    }
}

/// Inbound chat message
///
/// Built once by a platform listener and never mutated afterwards; the
/// builder-style `with_*` methods consume the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    platform: Platform,
    author_id: String,
    author: String,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    syndication: Option<Syndication>,
}

impl BridgeMessage {
    /// Create a plain chat message
    pub fn new(
        platform: Platform,
        author_id: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            author_id: author_id.into(),
            author: author.into(),
            text: text.into(),
            source_url: None,
            syndication: None,
        }
    }

    /// Attach a source URL
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Mark as syndicated content, subject to deduplication
    pub fn with_syndication(mut self, source: impl Into<String>, item_id: impl Into<String>) -> Self {
        self.syndication = Some(Syndication {
            source: source.into(),
            item_id: item_id.into(),
        });
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn syndication(&self) -> Option<&Syndication> {
        self.syndication.as_ref()
    }

    /// Platform-scoped sender identity
    pub fn identity(&self) -> Identity {
        Identity::scoped(self.platform, &self.author_id)
    }

    /// Dedup key, only for syndicated content
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.syndication.as_ref().map(Syndication::fingerprint)
    }
}
