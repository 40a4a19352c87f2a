//! Error types for the core pipeline.
//!
//! Only [`ConfigError`] is ever fatal, and only at startup. Everything else
//! is contained where it occurs: a [`ParseError`] drops one message, a
//! [`StorageError`] skips one save.

use thiserror::Error;

/// Invalid setup detected while building channels, buffers or alerts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Two channels share an id or a topic.
    #[error("Duplicate channel: {0}")]
    DuplicateChannel(String),

    /// The time window must be strictly positive.
    #[error("Invalid window: {0}ms (must be > 0)")]
    InvalidWindow(i64),

    /// The point cap must be strictly positive.
    #[error("Invalid max_points: must be > 0")]
    InvalidMaxPoints,

    /// Alert threshold is NaN or infinite.
    #[error("Invalid alert threshold: {0}")]
    InvalidThreshold(f64),

    /// Alert cooldown is negative.
    #[error("Invalid alert cooldown: {0}ms (must be >= 0)")]
    InvalidCooldown(i64),

    /// A timer period of zero.
    #[error("Invalid interval for {0}: must be > 0")]
    ZeroInterval(&'static str),

    /// A setting refers to a channel that was never registered.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

/// Failure to persist a channel snapshot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Samples could not be encoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A payload that is not a finite decimal number.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// Payload bytes are not valid UTF-8.
    #[error("Payload is not valid UTF-8")]
    Utf8,

    /// Payload text is not a number.
    #[error("Payload is not a number: {0:?}")]
    NotANumber(String),

    /// Payload parsed to NaN or infinity.
    #[error("Payload is not finite: {0}")]
    NotFinite(f64),
}
