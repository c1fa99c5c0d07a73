//! Routing decisions and broadcast results

use std::fmt;

use contracts::{Fingerprint, Platform};

/// Why an inbound message was not relayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Text starts with the other platform's marker (our own relay)
    LoopPrevention,
    /// Sender exceeded the sliding-window limit
    RateLimited,
    /// Syndicated item already posted within the TTL
    Duplicate,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::LoopPrevention => "loop_prevention",
            DropReason::RateLimited => "rate_limited",
            DropReason::Duplicate => "duplicate",
        }
    }
}

/// Why an accepted message did not reach the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// Neither target nor fallback target configured
    MissingDestination,
    /// Sink returned `Ok(false)`
    Rejected,
    /// Sink returned an error
    Transport(String),
    /// Sink did not answer within the send timeout
    Timeout,
}

impl SendFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendFailure::MissingDestination => "missing_destination",
            SendFailure::Rejected => "rejected",
            SendFailure::Transport(_) => "transport",
            SendFailure::Timeout => "timeout",
        }
    }
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendFailure::MissingDestination => f.write_str("destination missing"),
            SendFailure::Rejected => f.write_str("rejected by platform"),
            SendFailure::Transport(message) => write!(f, "transport error: {message}"),
            SendFailure::Timeout => f.write_str("send timed out"),
        }
    }
}

/// Result of routing one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Exactly one send, accepted by the sink
    Forwarded { destination: Platform, target: String },
    /// Zero sends
    Dropped(DropReason),
    /// One send attempted (or destination missing), not delivered
    SendFailed(SendFailure),
}

impl RouteOutcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, RouteOutcome::Forwarded { .. })
    }

    /// Metric label: `forwarded` / `dropped` / `send_failed`
    pub fn label(&self) -> &'static str {
        match self {
            RouteOutcome::Forwarded { .. } => "forwarded",
            RouteOutcome::Dropped(_) => "dropped",
            RouteOutcome::SendFailed(_) => "send_failed",
        }
    }

    /// Metric label for the specific reason
    pub fn reason(&self) -> &'static str {
        match self {
            RouteOutcome::Forwarded { .. } => "ok",
            RouteOutcome::Dropped(reason) => reason.as_str(),
            RouteOutcome::SendFailed(failure) => failure.as_str(),
        }
    }
}

/// A post pushed to both platforms (scheduled digest, announcements)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastPost {
    text: String,
    fingerprint: Option<Fingerprint>,
}

impl BroadcastPost {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fingerprint: None,
        }
    }

    /// Subject the post to deduplication
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }
}

/// Per-platform broadcast result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub platform: Platform,
    /// Target id on success
    pub result: Result<String, SendFailure>,
}

/// Result of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Suppressed by the dedupe cache; no sends happened
    pub duplicate: bool,
    pub deliveries: Vec<Delivery>,
}

impl BroadcastOutcome {
    pub(crate) fn duplicate() -> Self {
        Self {
            duplicate: true,
            deliveries: Vec::new(),
        }
    }

    pub fn delivered_count(&self) -> usize {
        self.deliveries.iter().filter(|d| d.result.is_ok()).count()
    }

    /// Failed deliveries
    pub fn failures(&self) -> impl Iterator<Item = (Platform, &SendFailure)> {
        self.deliveries
            .iter()
            .filter_map(|d| d.result.as_ref().err().map(|e| (d.platform, e)))
    }

    /// Sent and delivered everywhere
    pub fn is_complete(&self) -> bool {
        !self.duplicate && self.failures().next().is_none()
    }
}

/// Entries evicted by a maintenance sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub identities_evicted: usize,
    pub identities_tracked: usize,
    pub dedupe_evicted: usize,
    pub dedupe_tracked: usize,
}

impl SweepReport {
    pub fn total_evicted(&self) -> usize {
        self.identities_evicted + self.dedupe_evicted
    }
}
