//! Error types for the queue engine
//!
//! This module defines all error types using anyhow for consistent error
//! handling throughout the crate.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific queueing scenarios
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid queue request: {reason}")]
    InvalidQueueRequest { reason: String },

    #[error("session template not found: {session_type}")]
    TemplateNotFound { session_type: u32 },

    #[error("instance creation failed for session type {session_type}: {reason}")]
    InstanceCreationFailed { session_type: u32, reason: String },

    #[error("participant not found: {participant_id}")]
    ParticipantNotFound { participant_id: u64 },

    #[error("configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("internal engine error: {message}")]
    InternalError { message: String },
}
