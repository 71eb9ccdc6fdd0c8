//! Error types for ckan-migrate.

use thiserror::Error;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while migrating between catalog instances.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file lacks required keys.
    #[error("Configuration file is missing the following required keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    /// Network-level failure (connect, timeout, body read).
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-200 response from a catalog endpoint.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response.
        message: String,
    },

    /// 200 response whose payload reports failure.
    #[error("API error: {0}")]
    Api(String),

    /// Staging area problem (missing file, bad layout).
    #[error("Staging error: {0}")]
    Staging(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
