//! # Error Types
//!
//! This module defines error types used throughout the etiqueta library.
//!
//! Generation and validation errors are raised before any delivery attempt
//! and are never retried. Channel errors are recovered by the orchestrator
//! (it moves on to the next channel) and only surface to callers folded into
//! [`EtiquetaError::AllChannelsExhausted`].

use thiserror::Error;

/// Main error type for etiqueta operations
#[derive(Debug, Error)]
pub enum EtiquetaError {
    /// Coordinate math on a non-finite or out-of-range value
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Element missing required fields, unsupported element or symbology
    #[error("Generation error: {0}")]
    Generation(String),

    /// Command stream does not fit its declared label bounds
    #[error("Validation failure: {0}")]
    Validation(String),

    /// Channel pre-check failed (not counted as an attempt)
    #[error("Channel '{channel}' unavailable: {reason}")]
    ChannelUnavailable { channel: String, reason: String },

    /// Channel attempt exceeded its hard timeout
    #[error("Channel '{channel}' timed out after {timeout_ms}ms")]
    ChannelTimeout { channel: String, timeout_ms: u64 },

    /// Process, socket or library level failure inside a channel
    #[error("Channel '{channel}' failed: {message}")]
    Channel { channel: String, message: String },

    /// Every configured channel was skipped or failed
    #[error("All channels exhausted: {0}")]
    AllChannelsExhausted(String),

    /// Invalid or missing configuration
    #[error("Config error: {0}")]
    Config(String),

    /// No job with the requested id in the job history
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EtiquetaError {
    /// Shorthand for a [`EtiquetaError::Channel`] failure.
    pub fn channel(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Channel {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`EtiquetaError::ChannelUnavailable`] pre-check failure.
    pub fn unavailable(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ChannelUnavailable {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EtiquetaError>;
