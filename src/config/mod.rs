//! Configuration for the queue engine
//!
//! This module handles loading the matchmaking options from environment
//! variables or a TOML file, with validation and defaults.

pub mod settings;

// Re-export commonly used types
pub use settings::QueueSettings;
