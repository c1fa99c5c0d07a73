//! Time-boxed deduplication cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use contracts::{ContractError, DedupeConfig};
use tracing::debug;

/// Default entry count that triggers an opportunistic sweep on insert
const DEFAULT_SWEEP_THRESHOLD: usize = 10_000;

/// "Have I already forwarded this item within the retention period?"
///
/// Keys are caller-built fingerprints (`"yt:abc123"`). A key seen within
/// `ttl` is a duplicate; an older one is expired and treated as new.
/// Expiry is lazy on lookup; inserts sweep the whole map once it grows
/// past a high-water mark. The mark starts at `sweep_threshold` and, after
/// each sweep, moves to twice the surviving count, so a cache full of live
/// keys is not rescanned on every insert.
pub struct DedupeCache {
    ttl: Duration,
    sweep_threshold: usize,
    entries: Mutex<Entries>,
}

struct Entries {
    keys: HashMap<String, Instant>,
    /// Length at which the next insert sweeps
    next_sweep_at: usize,
}

impl fmt::Debug for DedupeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupeCache")
            .field("ttl", &self.ttl)
            .field("sweep_threshold", &self.sweep_threshold)
            .field("len", &self.len())
            .finish()
    }
}

impl DedupeCache {
    /// Create a cache with the given retention
    ///
    /// # Errors
    /// Zero `ttl`
    pub fn new(ttl: Duration) -> Result<Self, ContractError> {
        if ttl.is_zero() {
            return Err(ContractError::invalid_parameter("ttl_sec", "must be > 0"));
        }

        Ok(Self {
            ttl,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
            entries: Mutex::new(Entries {
                keys: HashMap::new(),
                next_sweep_at: DEFAULT_SWEEP_THRESHOLD,
            }),
        })
    }

    /// Create from configuration
    pub fn from_config(config: &DedupeConfig) -> Result<Self, ContractError> {
        Ok(Self::new(config.ttl())?.with_sweep_threshold(config.sweep_threshold))
    }

    /// Set the entry count above which inserts sweep expired keys
    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold.max(1);
        self.lock().next_sweep_at = self.sweep_threshold;
        self
    }

    /// Check `key` and record it if new
    ///
    /// Returns true when `key` was recorded less than (or exactly) `ttl`
    /// ago; the first-seen timestamp is left untouched. Otherwise records
    /// `key -> now` and returns false.
    pub fn seen_or_record(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.lock();

        if let Some(&recorded_at) = entries.keys.get(key) {
            if !self.is_expired(recorded_at, now) {
                return true;
            }
            entries.keys.remove(key);
        }

        if entries.keys.len() >= entries.next_sweep_at {
            let evicted = self.evict_expired(&mut entries, now);
            debug!(
                evicted,
                remaining = entries.keys.len(),
                next_sweep_at = entries.next_sweep_at,
                "dedupe opportunistic sweep"
            );
        }

        entries.keys.insert(key.to_string(), now);
        false
    }

    /// Remove every expired key
    ///
    /// Returns the number of keys removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let evicted = self.evict_expired(&mut entries, now);
        if evicted > 0 {
            debug!(evicted, remaining = entries.keys.len(), "dedupe sweep");
        }
        evicted
    }

    /// Number of stored keys, expired or not
    pub fn len(&self) -> usize {
        self.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().keys.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, recorded_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(recorded_at) > self.ttl
    }

    /// Drop expired keys and move the high-water mark
    fn evict_expired(&self, entries: &mut Entries, now: Instant) -> usize {
        let before = entries.keys.len();
        entries
            .keys
            .retain(|_, recorded_at| !self.is_expired(*recorded_at, now));
        let remaining = entries.keys.len();
        entries.next_sweep_at = self.sweep_threshold.max(remaining.saturating_mul(2));
        before - remaining
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
