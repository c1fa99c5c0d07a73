//! MessageSink trait - Router output interface
//!
//! Defines the abstract interface for platform sinks.

use crate::ContractError;

/// Outbound capability of one chat platform
///
/// Implemented once per real platform client and once per test double.
#[trait_variant::make(MessageSink: Send)]
pub trait LocalMessageSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver `text` to `target` (chat id / channel id)
    ///
    /// Text arrives already truncated to the platform limit.
    ///
    /// Returns `Ok(true)` when delivered, `Ok(false)` when the platform
    /// rejected the message (unknown channel, missing permissions).
    ///
    /// # Errors
    /// Transport failure (should include context)
    async fn send(&self, target: &str, text: &str) -> Result<bool, ContractError>;
}
