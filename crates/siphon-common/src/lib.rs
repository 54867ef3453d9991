//! Siphon Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities and error handling for the siphon workspace.
//!
//! # Overview
//!
//! This crate provides functionality used by the other workspace members:
//!
//! - **Error Handling**: the shared [`SiphonError`] and [`Result`] types
//! - **Logging**: tracing-based logging bootstrap ([`logging`])
//! - **Paths**: input path normalization ([`paths`])

pub mod error;
pub mod logging;
pub mod paths;

// Re-export commonly used types
pub use error::{Result, SiphonError};
