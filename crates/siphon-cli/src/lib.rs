//! Siphon CLI Library
//!
//! Command-line interface for bulk-importing records into a remote search
//! index.
//!
//! # Overview
//!
//! - **Importing**: Stream local JSON, NDJSON, or CSV files into an index
//!   (`siphon import`)
//! - **Adaptive batching**: Batch size is estimated from a data sample and
//!   measured network throughput, then adapts to memory pressure and
//!   timeouts during the run
//! - **CSV shaping**: Delimiter selection and regex-based column filters

pub mod commands;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};

/// Siphon - bulk record importer for search indexes
#[derive(Parser, Debug)]
#[command(name = "siphon")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import records from local files into an index
    Import {
        /// Source file or directory of files (.json, .ndjson, .jsonl, .csv)
        #[arg(short, long)]
        source: String,

        /// Name of the target index
        #[arg(short, long)]
        index: String,

        /// Destination endpoint URL
        #[arg(long, env = "SIPHON_ENDPOINT")]
        endpoint: String,

        /// Application identifier for the destination
        #[arg(long, env = "SIPHON_APP_ID")]
        app_id: String,

        /// API key for the destination
        #[arg(long, env = "SIPHON_API_KEY", hide_env_values = true)]
        api_key: String,

        /// Fixed batch size; skips estimation and the network speed test
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Maximum concurrent upload requests
        #[arg(long, default_value_t = siphon_ingest::config::DEFAULT_MAX_CONCURRENCY)]
        max_concurrency: usize,

        /// CSV field delimiter
        #[arg(long, default_value = ",")]
        csv_delimiter: String,

        /// Keep only CSV columns whose header matches this regex
        #[arg(long)]
        include_columns: Option<String>,

        /// Drop CSV columns whose header matches this regex
        #[arg(long)]
        exclude_columns: Option<String>,
    },
}
