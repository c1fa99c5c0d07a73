//! Relay orchestration module.

mod digest;
mod listener;
mod orchestrator;
mod stats;

pub use orchestrator::{Relay, RelayConfig};
