//! BridgeRouter - per-message relay policy between the two platforms

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    BridgeBlueprint, BridgeMessage, ContractError, DedupeScope, Fingerprint, MessageSink, Platform,
};
use throttle::{DedupeCache, RateLimiter};
use tracing::{debug, info, instrument, warn};

use crate::error::RouterError;
use crate::format::{format_forward, is_relayed, truncate_chars};
use crate::metrics::RouterMetrics;
use crate::outcome::{
    BroadcastOutcome, BroadcastPost, Delivery, DropReason, RouteOutcome, SendFailure, SweepReport,
};
use crate::penalty::PenaltyHook;
use crate::sinks::SharedSink;

/// Upper bound on one sink call unless set with [`RouterBuilder::send_timeout`]
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Router clock; follows tokio's (pausable) clock
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// One side of the bridge as seen by the router
struct Side {
    platform: Platform,
    sink: SharedSink,
    /// Where messages delivered *into* this platform go
    target: Option<String>,
    max_len: usize,
    /// Prefix of messages relayed *from* this platform
    marker: String,
}

impl Side {
    fn build(
        blueprint: &BridgeBlueprint,
        platform: Platform,
        sink: Option<SharedSink>,
    ) -> Result<Self, RouterError> {
        let sink = sink.ok_or(RouterError::missing_sink(platform))?;
        let config = blueprint.platform(platform);

        let marker = config.effective_marker(platform);
        if marker.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("{}.marker", platform.config_key()),
                "must not be empty",
            )
            .into());
        }

        Ok(Self {
            platform,
            sink,
            target: config.resolve_target().map(str::to_string),
            max_len: config.effective_max_len(platform),
            marker,
        })
    }
}

/// Builder for creating a BridgeRouter
pub struct RouterBuilder {
    blueprint: BridgeBlueprint,
    telegram_sink: Option<SharedSink>,
    discord_sink: Option<SharedSink>,
    limiter: Option<Arc<RateLimiter>>,
    dedupe: Option<Arc<DedupeCache>>,
    penalty: Option<Arc<dyn PenaltyHook>>,
    send_timeout: Duration,
}

impl RouterBuilder {
    /// Start from a configuration; routes, limits and markers are read once here
    pub fn new(blueprint: &BridgeBlueprint) -> Self {
        Self {
            blueprint: blueprint.clone(),
            telegram_sink: None,
            discord_sink: None,
            limiter: None,
            dedupe: None,
            penalty: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Register the outbound sink of `platform`
    pub fn sink<S>(self, platform: Platform, sink: S) -> Self
    where
        S: MessageSink + Sync + 'static,
    {
        self.shared_sink(platform, Arc::new(sink))
    }

    /// Register an already shared sink
    pub fn shared_sink(mut self, platform: Platform, sink: SharedSink) -> Self {
        match platform {
            Platform::Telegram => self.telegram_sink = Some(sink),
            Platform::Discord => self.discord_sink = Some(sink),
        }
        self
    }

    /// Use an existing limiter instead of building one from `[rate_limit]`
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Use an existing cache instead of building one from `[dedupe]`
    pub fn dedupe(mut self, dedupe: Arc<DedupeCache>) -> Self {
        self.dedupe = Some(dedupe);
        self
    }

    /// Called for every rate-limited message
    pub fn penalty_hook<H>(mut self, hook: H) -> Self
    where
        H: PenaltyHook + 'static,
    {
        self.penalty = Some(Arc::new(hook));
        self
    }

    /// Bound on a single sink call; a slower sink counts as a failed send
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Build the router
    ///
    /// # Errors
    /// Missing sink, empty marker, or invalid limiter / cache parameters.
    #[instrument(name = "router_builder_build", skip(self))]
    pub fn build(self) -> Result<BridgeRouter, RouterError> {
        let telegram = Side::build(&self.blueprint, Platform::Telegram, self.telegram_sink)?;
        let discord = Side::build(&self.blueprint, Platform::Discord, self.discord_sink)?;

        let limiter = match self.limiter {
            Some(limiter) => limiter,
            None => Arc::new(RateLimiter::from_config(&self.blueprint.rate_limit)?),
        };
        let dedupe = match self.dedupe {
            Some(dedupe) => dedupe,
            None => Arc::new(DedupeCache::from_config(&self.blueprint.dedupe)?),
        };

        for side in [&telegram, &discord] {
            if side.target.is_none() {
                warn!(
                    platform = %side.platform,
                    "No target configured; messages to this platform will fail"
                );
            }
        }

        info!(
            telegram_sink = telegram.sink.sink_name(),
            discord_sink = discord.sink.sink_name(),
            max_events = limiter.max_events(),
            window_secs = limiter.window().as_secs(),
            dedupe_ttl_secs = dedupe.ttl().as_secs(),
            dedupe_scope = ?self.blueprint.dedupe.scope,
            penalty_hook = self.penalty.is_some(),
            send_timeout_ms = self.send_timeout.as_millis() as u64,
            "Router built"
        );

        Ok(BridgeRouter {
            telegram,
            discord,
            limiter,
            dedupe,
            dedupe_scope: self.blueprint.dedupe.scope,
            penalty: self.penalty,
            penalty_timeout: self.blueprint.rate_limit.penalty_timeout(),
            send_timeout: self.send_timeout,
            metrics: Arc::new(RouterMetrics::new()),
        })
    }
}

/// Relays inbound messages to the opposite platform
///
/// Policy per message, in order: loop prevention, rate check (with
/// optional penalty), dedupe for syndicated content, then exactly one send
/// bounded by the send timeout.
/// Owns no background tasks; safe to share behind an `Arc`.
pub struct BridgeRouter {
    telegram: Side,
    discord: Side,
    limiter: Arc<RateLimiter>,
    dedupe: Arc<DedupeCache>,
    dedupe_scope: DedupeScope,
    penalty: Option<Arc<dyn PenaltyHook>>,
    penalty_timeout: Duration,
    send_timeout: Duration,
    metrics: Arc<RouterMetrics>,
}

impl fmt::Debug for BridgeRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeRouter")
            .field("telegram_target", &self.telegram.target)
            .field("discord_target", &self.discord.target)
            .field("limiter", &self.limiter)
            .field("dedupe", &self.dedupe)
            .field("dedupe_scope", &self.dedupe_scope)
            .field("penalty_hook", &self.penalty.is_some())
            .finish()
    }
}

impl BridgeRouter {
    pub fn builder(blueprint: &BridgeBlueprint) -> RouterBuilder {
        RouterBuilder::new(blueprint)
    }

    /// Route one inbound message
    ///
    /// Never fails: sink problems are logged and returned as
    /// [`RouteOutcome::SendFailed`].
    #[instrument(
        name = "router_on_message",
        skip(self, message),
        fields(origin = %message.platform(), author_id = message.author_id())
    )]
    pub async fn on_message(&self, message: &BridgeMessage) -> RouteOutcome {
        self.on_message_at(message, now()).await
    }

    /// Route one inbound message observed at `now`
    pub async fn on_message_at(&self, message: &BridgeMessage, now: Instant) -> RouteOutcome {
        let started = Instant::now();
        let outcome = self.route(message, now).await;

        self.record_outcome(message, &outcome);
        observability::record_route_latency_ms(started.elapsed().as_secs_f64() * 1000.0);
        outcome
    }

    /// Push one post to both platforms
    ///
    /// A fingerprinted post passes the dedupe check once, before either send.
    #[instrument(
        name = "router_broadcast",
        skip(self, post),
        fields(fingerprint = ?post.fingerprint().map(Fingerprint::as_str))
    )]
    pub async fn broadcast(&self, post: &BroadcastPost) -> BroadcastOutcome {
        self.broadcast_at(post, now()).await
    }

    /// Push one post to both platforms, observed at `now`
    pub async fn broadcast_at(&self, post: &BroadcastPost, now: Instant) -> BroadcastOutcome {
        if let Some(fingerprint) = post.fingerprint() {
            if self.dedupe.seen_or_record(fingerprint.as_str(), now) {
                info!(fingerprint = %fingerprint, "Broadcast already posted, skipped");
                self.metrics.inc_broadcast_duplicate();
                return BroadcastOutcome::duplicate();
            }
        }

        let (telegram, discord) = tokio::join!(
            self.deliver(&self.telegram, post.text()),
            self.deliver(&self.discord, post.text()),
        );
        let deliveries = vec![
            Delivery {
                platform: Platform::Telegram,
                result: telegram,
            },
            Delivery {
                platform: Platform::Discord,
                result: discord,
            },
        ];

        for delivery in &deliveries {
            let delivered = delivery.result.is_ok();
            self.metrics.record_broadcast_delivery(delivered);
            observability::record_broadcast(delivery.platform.tag(), delivered);

            if let Err(failure) = &delivery.result {
                warn!(
                    destination = %delivery.platform,
                    reason = failure.as_str(),
                    error = %failure,
                    "Broadcast delivery failed"
                );
            }
        }

        let outcome = BroadcastOutcome {
            duplicate: false,
            deliveries,
        };
        info!(
            delivered = outcome.delivered_count(),
            chars = post.text().chars().count(),
            "Broadcast finished"
        );
        outcome
    }

    /// Evict expired limiter windows and dedupe keys
    pub fn sweep(&self, now: Instant) -> SweepReport {
        let report = SweepReport {
            identities_evicted: self.limiter.sweep(now),
            identities_tracked: self.limiter.tracked_identities(),
            dedupe_evicted: self.dedupe.sweep(now),
            dedupe_tracked: self.dedupe.len(),
        };

        observability::record_sweep(
            "rate_limiter",
            report.identities_evicted,
            report.identities_tracked,
        );
        observability::record_sweep("dedupe", report.dedupe_evicted, report.dedupe_tracked);

        debug!(
            identities_evicted = report.identities_evicted,
            identities_tracked = report.identities_tracked,
            dedupe_evicted = report.dedupe_evicted,
            dedupe_tracked = report.dedupe_tracked,
            "Router sweep finished"
        );
        report
    }

    /// Sweep at the current time
    pub fn sweep_now(&self) -> SweepReport {
        self.sweep(now())
    }

    pub fn metrics(&self) -> &Arc<RouterMetrics> {
        &self.metrics
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn dedupe(&self) -> &Arc<DedupeCache> {
        &self.dedupe
    }

    /// Marker prefixed to messages relayed from `platform`
    pub fn marker(&self, platform: Platform) -> &str {
        &self.side(platform).marker
    }

    /// Resolved target for messages delivered into `platform`
    pub fn target(&self, platform: Platform) -> Option<&str> {
        self.side(platform).target.as_deref()
    }

    async fn route(&self, message: &BridgeMessage, now: Instant) -> RouteOutcome {
        let origin = self.side(message.platform());
        let destination = self.side(message.platform().opposite());

        // Our own relays come back carrying the other side's marker
        if is_relayed(message.text(), &destination.marker) {
            return RouteOutcome::Dropped(DropReason::LoopPrevention);
        }

        if self.limiter.record_and_check(&message.identity(), now) {
            self.apply_penalty(message).await;
            return RouteOutcome::Dropped(DropReason::RateLimited);
        }

        if let Some(fingerprint) = message.fingerprint() {
            let key = self.dedupe_key(&fingerprint, destination);
            if self.dedupe.seen_or_record(&key, now) {
                return RouteOutcome::Dropped(DropReason::Duplicate);
            }
        }

        let text = format_forward(
            &origin.marker,
            message.author(),
            message.text(),
            message.source_url(),
        );

        match self.deliver(destination, &text).await {
            Ok(target) => RouteOutcome::Forwarded {
                destination: destination.platform,
                target,
            },
            Err(failure) => RouteOutcome::SendFailed(failure),
        }
    }

    /// Truncate and send to `side`; returns the target id on delivery
    async fn deliver(&self, side: &Side, text: &str) -> Result<String, SendFailure> {
        let Some(target) = side.target.as_deref() else {
            return Err(SendFailure::MissingDestination);
        };

        let text = truncate_chars(text, side.max_len);
        match tokio::time::timeout(self.send_timeout, side.sink.send_dyn(target, text)).await {
            Ok(Ok(true)) => Ok(target.to_string()),
            Ok(Ok(false)) => Err(SendFailure::Rejected),
            Ok(Err(e)) => Err(SendFailure::Transport(e.to_string())),
            Err(_) => Err(SendFailure::Timeout),
        }
    }

    async fn apply_penalty(&self, message: &BridgeMessage) {
        let Some(hook) = &self.penalty else {
            return;
        };

        if let Err(e) = hook.penalize(message, self.penalty_timeout).await {
            warn!(
                origin = %message.platform(),
                author_id = message.author_id(),
                error = %e,
                "Penalty hook failed"
            );
        }
    }

    fn dedupe_key(&self, fingerprint: &Fingerprint, destination: &Side) -> String {
        match self.dedupe_scope {
            DedupeScope::Global => fingerprint.as_str().to_string(),
            DedupeScope::PerDestination => {
                let scope = destination
                    .target
                    .as_deref()
                    .unwrap_or(destination.platform.tag());
                format!("{scope}|{fingerprint}")
            }
        }
    }

    fn side(&self, platform: Platform) -> &Side {
        match platform {
            Platform::Telegram => &self.telegram,
            Platform::Discord => &self.discord,
        }
    }

    fn record_outcome(&self, message: &BridgeMessage, outcome: &RouteOutcome) {
        let origin = message.platform();
        self.metrics.record(outcome);
        observability::record_route_outcome(origin.tag(), outcome.label(), outcome.reason());

        match outcome {
            RouteOutcome::Forwarded {
                destination,
                target,
            } => info!(
                origin = %origin,
                destination = %destination,
                chat = %target,
                author = message.author(),
                "Message forwarded"
            ),
            RouteOutcome::Dropped(DropReason::LoopPrevention) => debug!(
                origin = %origin,
                reason = DropReason::LoopPrevention.as_str(),
                "Message dropped"
            ),
            RouteOutcome::Dropped(reason) => info!(
                origin = %origin,
                author_id = message.author_id(),
                reason = reason.as_str(),
                fingerprint = ?message.fingerprint().map(|f| f.to_string()),
                "Message dropped"
            ),
            RouteOutcome::SendFailed(failure) => warn!(
                origin = %origin,
                destination = %origin.opposite(),
                reason = failure.as_str(),
                error = %failure,
                "Message not delivered"
            ),
        }
    }
}
