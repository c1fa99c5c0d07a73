//! Scheduler error types

use thiserror::Error;

/// Scheduler configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Interval duration must be greater than zero
    #[error("scheduler interval must be greater than 0")]
    ZeroInterval,
}
