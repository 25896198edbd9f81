//! Ready Room - queue admission and matchmaking engine
//!
//! This crate decides when enough compatible participants exist to start a
//! multiplayer session instance: per-bracket waiting pools for solo players
//! and pre-formed parties, greedy team assembly under group-size
//! constraints, rating-window opponent search that widens with wait time,
//! and a bounded invitation lifecycle (offer, reminder, timeout) driven by
//! a single-threaded external scheduler.

pub mod config;
pub mod error;
pub mod external;
pub mod queue;
pub mod timer;
pub mod types;
pub mod wait_time;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use config::QueueSettings;
pub use external::{Clock, InstanceDirectory, Notifier, PlayerDirectory, RatingService};
pub use queue::{EnqueueRequest, GroupEntry, SessionQueue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
