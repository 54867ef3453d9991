//! Error types for the Siphon CLI
//!
//! This module provides user-friendly error types with clear, actionable
//! messages that help users understand what went wrong and how to fix it.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
///
/// All errors are designed to be user-facing with clear messages and suggestions.
#[derive(Error, Debug)]
pub enum CliError {
    /// Command-line arguments are missing or inconsistent
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A column filter pattern failed to compile
    #[error("Invalid column filter '{pattern}': {message}. Column filters are regular expressions matched against CSV headers.")]
    InvalidColumnFilter { pattern: String, message: String },

    /// The import pipeline failed
    #[error(transparent)]
    Import(#[from] siphon_ingest::ImportError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an invalid-arguments error
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }
}
