//! Error types for adapters.

use thiserror::Error;

/// Errors from the collaborators around the core pipeline.
///
/// None of these are fatal: callers log them and carry on.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The requested file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a document.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The notification could not be delivered.
    #[error("Notification not delivered: {0}")]
    Delivery(String),
}
