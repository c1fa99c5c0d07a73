//! Feed polling with keyword filter and last-link suppression

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{NewsConfig, MAX_NEWS_FEEDS};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use crate::error::FeedError;
use crate::parser::{parse_first_item, NewsItem};

const USER_AGENT: &str = concat!("bridge-relay/", env!("CARGO_PKG_VERSION"));

/// What the watcher made of a feed's newest item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Worth posting
    New(NewsItem),
    /// First matching item since start; remembered, not posted
    Primed,
    /// Same link as the last post
    Seen,
    /// Title matches none of the keywords
    Filtered,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New(_) => "new",
            Self::Primed => "primed",
            Self::Seen => "seen",
            Self::Filtered => "filtered",
        }
    }
}

/// Polls RSS/Atom feeds for one new headline per cycle
///
/// Keeps only the last posted link, so after a restart the first matching
/// headline primes the watcher instead of being reposted.
pub struct FeedWatcher {
    feeds: Vec<String>,
    keywords: Vec<String>,
    client: Client,
    last_link: Mutex<Option<String>>,
}

impl std::fmt::Debug for FeedWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedWatcher")
            .field("feeds", &self.feeds)
            .field("keywords", &self.keywords)
            .finish()
    }
}

impl FeedWatcher {
    /// Build from configuration
    ///
    /// Blank feeds and keywords are dropped, keywords are lowercased and
    /// only the first [`MAX_NEWS_FEEDS`] feeds are kept.
    ///
    /// # Errors
    /// The HTTP client cannot be built
    pub fn new(config: &NewsConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(FeedError::Client)?;

        let feeds: Vec<String> = config
            .feeds
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        if feeds.len() > MAX_NEWS_FEEDS {
            warn!(
                configured = feeds.len(),
                polled = MAX_NEWS_FEEDS,
                "Too many news feeds, extra feeds are ignored"
            );
        }

        let keywords = config
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            feeds: feeds.into_iter().take(MAX_NEWS_FEEDS).collect(),
            keywords,
            client,
            last_link: Mutex::new(None),
        })
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Case-insensitive substring match; no keywords accepts everything
    pub fn matches_keywords(&self, title: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let title = title.to_lowercase();
        self.keywords.iter().any(|k| title.contains(k.as_str()))
    }

    /// Apply the keyword filter and last-link suppression to `item`
    pub fn accept(&self, item: NewsItem) -> Verdict {
        if !self.matches_keywords(&item.title) {
            return Verdict::Filtered;
        }

        let mut last_link = self.lock();
        if last_link.as_deref() == Some(item.link.as_str()) {
            return Verdict::Seen;
        }

        let primed = last_link.replace(item.link.clone()).is_none();
        if primed {
            Verdict::Primed
        } else {
            Verdict::New(item)
        }
    }

    /// Download `feed` and parse its newest item
    ///
    /// # Errors
    /// Transport failure, non-success status or malformed XML
    pub async fn fetch(&self, feed: &str) -> Result<Option<NewsItem>, FeedError> {
        let response = self
            .client
            .get(feed)
            .send()
            .await
            .map_err(|e| FeedError::http(feed, e))?;

        if !response.status().is_success() {
            return Err(FeedError::status(feed, response.status().as_u16()));
        }

        let body = response.text().await.map_err(|e| FeedError::http(feed, e))?;
        parse_first_item(&body, feed)
    }

    /// Poll feeds in order and return the first new headline
    ///
    /// Failing feeds are logged and skipped. Priming ends the cycle.
    #[instrument(skip(self), fields(feeds = self.feeds.len()))]
    pub async fn poll(&self) -> Option<NewsItem> {
        for feed in &self.feeds {
            let item = match self.fetch(feed).await {
                Ok(Some(item)) => item,
                Ok(None) => {
                    debug!(feed = %feed, "Feed has no usable item");
                    observability::record_feed_poll("empty");
                    continue;
                }
                Err(e) => {
                    warn!(feed = %feed, error = %e, "Failed to poll feed");
                    observability::record_feed_poll("error");
                    continue;
                }
            };

            let verdict = self.accept(item);
            observability::record_feed_poll(verdict.as_str());
            match verdict {
                Verdict::New(item) => {
                    info!(feed = %feed, link = %item.link, "New headline");
                    return Some(item);
                }
                Verdict::Primed => {
                    info!(feed = %feed, "News watcher primed with the current headline");
                    return None;
                }
                Verdict::Seen | Verdict::Filtered => {
                    debug!(feed = %feed, verdict = verdict.as_str(), "Headline skipped");
                }
            }
        }
        None
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.last_link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
