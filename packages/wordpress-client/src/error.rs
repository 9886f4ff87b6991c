//! Error types for the WordPress client.

use thiserror::Error;

/// Result type for WordPress client operations.
pub type Result<T> = std::result::Result<T, WpError>;

/// WordPress client errors.
#[derive(Debug, Error)]
pub enum WpError {
    /// Network-level failure (connection, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the WordPress REST API
    #[error("WP API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
