//! Siphon CLI - Main entry point

use clap::Parser;
use siphon_cli::{Cli, Commands};
use siphon_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbose flag and environment
    let log_config = if cli.verbose {
        // Verbose mode: log to console with debug level
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Console)
            .log_file_prefix("siphon".to_string())
            .build()
    } else {
        // Normal mode: only warnings and errors to console
        LogConfig::builder()
            .level(LogLevel::Warn)
            .output(LogOutput::Console)
            .log_file_prefix("siphon".to_string())
            .build()
    };

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    // Initialize logging (ignore errors as the CLI should work without logging)
    let _ = init_logging(&log_config);

    // Execute command
    let result = execute_command(cli).await;

    // Handle result
    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: Cli) -> siphon_cli::Result<()> {
    match cli.command {
        Commands::Import {
            source,
            index,
            endpoint,
            app_id,
            api_key,
            batch_size,
            max_concurrency,
            csv_delimiter,
            include_columns,
            exclude_columns,
        } => {
            siphon_cli::commands::import::run(siphon_cli::commands::import::ImportArgs {
                source,
                index,
                endpoint,
                app_id,
                api_key,
                batch_size,
                max_concurrency,
                csv_delimiter,
                include_columns,
                exclude_columns,
            })
            .await
        }
    }
}
