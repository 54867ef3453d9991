//! CLI command implementations

pub mod import;
