//! Router error types

use contracts::Platform;
use thiserror::Error;

/// Errors raised while assembling a router
///
/// Routing itself never fails: per-message problems are reported as
/// [`RouteOutcome`](crate::RouteOutcome) values.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No sink registered for a platform
    #[error("no sink registered for platform '{platform}'")]
    MissingSink { platform: Platform },

    /// Invalid primitive or configuration (from contract)
    #[error("router configuration error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl RouterError {
    pub fn missing_sink(platform: Platform) -> Self {
        Self::MissingSink { platform }
    }
}
