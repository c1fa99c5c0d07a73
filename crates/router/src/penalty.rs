//! Penalty hook - action taken against a throttled sender

use std::time::Duration;

use async_trait::async_trait;
use contracts::{BridgeMessage, ContractError};
use tracing::warn;

/// Invoked once for every message dropped by the rate limiter
///
/// A platform client implements this to mute / time out the sender.
/// Errors are logged by the router and never change the routing outcome.
#[async_trait]
pub trait PenaltyHook: Send + Sync {
    async fn penalize(&self, message: &BridgeMessage, timeout: Duration)
        -> Result<(), ContractError>;
}

/// Penalty hook that only logs the would-be timeout
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPenaltyHook;

#[async_trait]
impl PenaltyHook for LogPenaltyHook {
    async fn penalize(
        &self,
        message: &BridgeMessage,
        timeout: Duration,
    ) -> Result<(), ContractError> {
        warn!(
            platform = %message.platform(),
            author_id = message.author_id(),
            author = message.author(),
            timeout_secs = timeout.as_secs(),
            "Flood detected, sender timed out"
        );
        Ok(())
    }
}
