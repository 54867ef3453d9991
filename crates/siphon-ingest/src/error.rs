//! Error types for the ingestion pipeline
//!
//! Errors are user-facing: capacity-related failures carry remediation
//! guidance (reduce batch size and/or concurrency) in their display text.

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Errors that abort the pipeline (or prevent it from starting)
#[derive(Error, Debug)]
pub enum ImportError {
    /// Missing or invalid required configuration; raised before the pipeline starts
    #[error("Configuration error: {0}. Check your command-line flags and environment variables.")]
    Config(String),

    /// Unreadable input file, empty record sample, or throughput probe failure
    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A destination failure that is not eligible for split-and-retry
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Internal queue failure (worker panic, closed channel)
    #[error("Upload queue failure: {0}")]
    Queue(String),
}

impl ImportError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a source read error
    pub fn source_read(msg: impl Into<String>) -> Self {
        Self::SourceRead(msg.into())
    }
}

/// Classified destination failures.
///
/// Only timeout-class failures are retryable; the Retry Coordinator splits
/// and re-enqueues those. Everything else propagates as fatal.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Timeout-class failure; the batch may be too large for the connection
    #[error("destination request timed out: {0}. You may be attempting to import batches too large for the network connection.")]
    Timeout(String),

    /// The destination rejected the batch outright
    #[error("destination rejected batch (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure other than a timeout
    #[error("network error: {0}")]
    Network(String),
}

impl UploadError {
    /// Whether the Retry Coordinator should handle this failure
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Timeout(_))
    }
}
