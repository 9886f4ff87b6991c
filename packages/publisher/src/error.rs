//! Typed errors for the publisher library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Storage failures are the one fatal class: ledger correctness depends on
//! every write committing or rolling back cleanly, so they propagate
//! uncaught. Remote-store failures are recorded (ledger `failed` rows,
//! per-deletion report entries) rather than escalated by the callers that
//! own those flows.

use thiserror::Error;

/// Errors that can occur during publisher operations.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Ledger storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Remote content store call failed
    #[error("remote store error: {0}")]
    Remote(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A ledger row carried a state string outside the closed set
    #[error("unknown ledger state: {0}")]
    UnknownState(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Report artifact could not be written
    #[error("report I/O error: {0}")]
    ReportIo(#[from] std::io::Error),
}

impl PublisherError {
    /// Wrap a storage-layer error.
    pub fn storage<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Storage(Box::new(err))
    }

    /// Wrap a remote-store error.
    pub fn remote<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Remote(Box::new(err))
    }
}

/// Result type alias for publisher operations.
pub type Result<T> = std::result::Result<T, PublisherError>;
