//! LogSink - logs outbound messages via tracing

use contracts::{ContractError, MessageSink};
use tracing::{info, instrument};

/// Sink that logs instead of calling a platform API
///
/// Stands in for a real platform client in the CLI and in dry runs.
#[derive(Debug, Clone)]
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl MessageSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_send",
        skip(self, text),
        fields(sink = %self.name, chars = text.chars().count())
    )]
    async fn send(&self, target: &str, text: &str) -> Result<bool, ContractError> {
        info!(sink = %self.name, chat = target, text, "Message delivered");
        Ok(true)
    }
}
