//! `siphon import` command implementation
//!
//! Builds the pipeline configuration from command-line arguments and runs the
//! import end to end, rendering progress to the terminal.

use crate::error::{CliError, Result};
use crate::progress::TerminalProgress;
use colored::Colorize;
use regex::Regex;
use siphon_ingest::config::{CsvOptions, ImportConfig};
use siphon_ingest::destination::HttpDestination;
use siphon_ingest::memory::ProcessMemory;
use siphon_ingest::pipeline::{self, ImportSummary};
use siphon_ingest::probe::HttpProbe;
use std::sync::Arc;

/// Arguments for the import command
#[derive(Debug)]
pub struct ImportArgs {
    pub source: String,
    pub index: String,
    pub endpoint: String,
    pub app_id: String,
    pub api_key: String,
    pub batch_size: Option<usize>,
    pub max_concurrency: usize,
    pub csv_delimiter: String,
    pub include_columns: Option<String>,
    pub exclude_columns: Option<String>,
}

/// Run an import
pub async fn run(args: ImportArgs) -> Result<()> {
    let config = build_config(&args)?;

    let destination = Arc::new(HttpDestination::new(
        args.endpoint.clone(),
        args.app_id.clone(),
        args.api_key.clone(),
        args.index.clone(),
    )?);
    let probe = HttpProbe::new(args.endpoint.clone())?;

    println!(
        "{} Importing into index '{}'",
        "→".cyan(),
        args.index
    );

    let progress = Arc::new(TerminalProgress::new());
    let summary = pipeline::run(
        config,
        destination,
        &probe,
        Box::new(ProcessMemory),
        Arc::clone(&progress) as Arc<dyn siphon_ingest::progress::ProgressReporter>,
    )
    .await;
    progress.finish();

    let summary = summary?;
    print_summary(&summary);
    Ok(())
}

/// Translate command-line arguments into a pipeline configuration
fn build_config(args: &ImportArgs) -> Result<ImportConfig> {
    let delimiter = parse_delimiter(&args.csv_delimiter)?;
    let include_columns = compile_filter(args.include_columns.as_deref())?;
    let exclude_columns = compile_filter(args.exclude_columns.as_deref())?;

    let mut config = ImportConfig::new(&args.source);
    config.batch_size = args.batch_size;
    config.max_concurrency = args.max_concurrency;
    config.csv = CsvOptions {
        delimiter,
        include_columns,
        exclude_columns,
    };
    Ok(config)
}

fn parse_delimiter(input: &str) -> Result<u8> {
    let bytes = input.as_bytes();
    if bytes.len() != 1 {
        return Err(CliError::invalid_arguments(format!(
            "CSV delimiter must be a single ASCII character, got '{input}'"
        )));
    }
    Ok(bytes[0])
}

fn compile_filter(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern {
        None => Ok(None),
        Some(pattern) => Regex::new(pattern)
            .map(Some)
            .map_err(|e| CliError::InvalidColumnFilter {
                pattern: pattern.to_string(),
                message: e.to_string(),
            }),
    }
}

fn print_summary(summary: &ImportSummary) {
    println!(
        "\n{} Imported {} record(s) in {} batch(es)",
        "✓".green().bold(),
        summary.records_imported,
        summary.batches_uploaded
    );
    if summary.retries > 0 {
        println!(
            "  {} retried upload(s); final batch size {}",
            summary.retries, summary.final_batch_size
        );
    }
    if summary.records_dropped > 0 {
        println!(
            "{} {} record(s) dropped after retry exhaustion",
            "!".yellow().bold(),
            summary.records_dropped
        );
    }
}
