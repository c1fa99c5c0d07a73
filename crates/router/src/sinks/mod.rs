//! Sink implementations
//!
//! Contains LogSink and ChannelSink, plus the type-erased sink handle the
//! router stores per platform.

mod channel;
mod log;

use std::sync::Arc;

use async_trait::async_trait;
use contracts::{ContractError, MessageSink};

pub use self::channel::{ChannelSink, OutboundMessage};
pub use self::log::LogSink;

/// Object-safe view of a [`MessageSink`]
///
/// Blanket-implemented for every `MessageSink + Sync`, so the router can
/// hold different sink types for the two platforms.
#[async_trait]
pub trait DynMessageSink: Send + Sync {
    fn sink_name(&self) -> &str;

    async fn send_dyn(&self, target: &str, text: &str) -> Result<bool, ContractError>;
}

#[async_trait]
impl<S> DynMessageSink for S
where
    S: MessageSink + Sync,
{
    fn sink_name(&self) -> &str {
        MessageSink::name(self)
    }

    async fn send_dyn(&self, target: &str, text: &str) -> Result<bool, ContractError> {
        MessageSink::send(self, target, text).await
    }
}

/// Shared handle to a platform sink
pub type SharedSink = Arc<dyn DynMessageSink>;
