//! Feed error types

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request or body read failed
    #[error("failed to fetch feed '{feed}': {source}")]
    Http {
        feed: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("feed '{feed}' returned status {status}")]
    Status { feed: String, status: u16 },

    /// Malformed XML
    #[error("feed '{feed}' is not valid XML: {message}")]
    Xml { feed: String, message: String },
}

impl FeedError {
    pub fn http(feed: &str, source: reqwest::Error) -> Self {
        Self::Http {
            feed: feed.to_string(),
            source,
        }
    }

    pub fn status(feed: &str, status: u16) -> Self {
        Self::Status {
            feed: feed.to_string(),
            status,
        }
    }

    pub fn xml(feed: &str, err: impl fmt::Display) -> Self {
        Self::Xml {
            feed: feed.to_string(),
            message: err.to_string(),
        }
    }
}
