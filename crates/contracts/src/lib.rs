//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Primitives take `std::time::Instant` explicitly (`now`), never read the clock themselves
//! - Durations in configuration are whole seconds

mod blueprint;
mod error;
mod message;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use message::*;
pub use sink::*;
