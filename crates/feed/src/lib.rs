//! # Feed
//!
//! RSS/Atom news syndication for the bridge.
//!
//! 负责：
//! - `parse_first_item`: newest item of an RSS 2.0 / RSS 1.0 / Atom document
//! - `format_post`: headline cleanup, game/category emoji and a one-line summary
//! - `FeedWatcher`: polls the configured feeds, applies the keyword filter and
//!   suppresses the last posted link
//!
//! The watcher only decides *what* to post. Delivery goes through the
//! router's broadcast, with [`NewsItem::fingerprint`] as the dedupe key.

mod error;
mod format;
mod parser;
mod watcher;

pub use error::FeedError;
pub use format::{clean_title, format_post};
pub use parser::{parse_first_item, NewsItem};
pub use watcher::{FeedWatcher, Verdict};

pub use contracts::{NewsConfig, MAX_NEWS_FEEDS};
