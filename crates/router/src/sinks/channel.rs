//! ChannelSink - hands outbound messages to an mpsc receiver

use contracts::{ContractError, MessageSink};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, instrument, warn};

/// One message as handed to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub target: String,
    pub text: String,
}

/// Sink backed by a bounded channel
///
/// The receiving side is usually a platform client task. `send` never
/// waits: a full queue or a dropped receiver is reported as
/// `SinkUnavailable` and the message is not queued.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    name: String,
    tx: mpsc::Sender<OutboundMessage>,
}

impl ChannelSink {
    /// Create the sink and the receiver that drains it
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }
}

impl MessageSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "channel_sink_send", skip(self, text), fields(sink = %self.name))]
    async fn send(&self, target: &str, text: &str) -> Result<bool, ContractError> {
        let message = OutboundMessage {
            target: target.to_string(),
            text: text.to_string(),
        };

        match self.tx.try_send(message) {
            Ok(()) => {
                debug!(sink = %self.name, chat = target, "Message queued");
                Ok(true)
            }
            Err(TrySendError::Full(_)) => {
                warn!(sink = %self.name, chat = target, "Queue full, message dropped");
                Err(ContractError::sink_unavailable(&self.name, "queue full"))
            }
            Err(TrySendError::Closed(_)) => {
                Err(ContractError::sink_unavailable(&self.name, "receiver dropped"))
            }
        }
    }
}
