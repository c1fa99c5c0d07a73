//! # Throttle
//!
//! Anti-flood and anti-repost primitives.
//!
//! 负责：
//! - `RateLimiter`: per-identity sliding-window counter
//! - `DedupeCache`: time-boxed "seen before" set for syndicated content
//!
//! Both own a guarded map and expose only atomic check-and-record
//! operations plus a `sweep` for memory housekeeping. Neither reads the
//! clock: callers pass `now`.
//!
//! ## 使用示例
//!
//! ```
//! use std::time::{Duration, Instant};
//! use throttle::{DedupeCache, RateLimiter};
//!
//! let limiter = RateLimiter::new(5, Duration::from_secs(8)).unwrap();
//! let now = Instant::now();
//! assert!(!limiter.record_and_check(&"tg:42".into(), now));
//!
//! let cache = DedupeCache::new(Duration::from_secs(60)).unwrap();
//! assert!(!cache.seen_or_record("yt:abc123", now));
//! assert!(cache.seen_or_record("yt:abc123", now));
//! ```

mod dedupe;
mod rate_limiter;

pub use dedupe::DedupeCache;
pub use rate_limiter::RateLimiter;

pub use contracts::{DedupeConfig, Identity, RateLimitConfig};
