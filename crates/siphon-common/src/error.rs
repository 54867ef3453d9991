//! Error types shared across the siphon workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, SiphonError>;

/// Shared error type for cross-crate concerns
#[derive(Error, Debug)]
pub enum SiphonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SiphonError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
