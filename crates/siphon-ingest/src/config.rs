//! Import configuration
//!
//! Everything here is fixed at pipeline start. The source path may name a
//! single file or a directory of files; credentials and endpoint belong to
//! the destination client, not to this struct.

use crate::error::{ImportError, Result};
use crate::record::Record;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Pipeline Constants
// ============================================================================

/// Default number of concurrent upload calls.
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;

/// Target payload size per upload in MB; N concurrent batches together
/// approximate this target.
pub const DEFAULT_TARGET_BATCH_MB: f64 = 10.0;

/// Minimum batch-size floor applied to estimation and adaptive shrinking.
pub const DEFAULT_MIN_BATCH_SIZE: usize = 100;

/// Number of records sampled from the first input file for size estimation.
pub const SAMPLE_SIZE: usize = 10_000;

/// Per-record transformation applied between parsing and batching
pub type TransformFn = Arc<dyn Fn(Record) -> Record + Send + Sync>;

/// CSV parse parameters
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter
    pub delimiter: u8,

    /// Keep only columns whose header matches
    pub include_columns: Option<Regex>,

    /// Drop columns whose header matches; applied after `include_columns`
    pub exclude_columns: Option<Regex>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            include_columns: None,
            exclude_columns: None,
        }
    }
}

/// Configuration surface for one import run
#[derive(Clone)]
pub struct ImportConfig {
    /// Source file or directory of files
    pub source: PathBuf,

    /// Explicit batch size; skips estimation and the throughput probe
    pub batch_size: Option<usize>,

    /// Maximum concurrent upload calls
    pub max_concurrency: usize,

    /// Target payload size per upload in MB
    pub target_batch_mb: f64,

    /// Minimum batch-size floor
    pub min_batch_size: usize,

    /// CSV parse parameters, ignored for JSON inputs
    pub csv: CsvOptions,

    /// Per-record transformation, identity by default
    pub transform: TransformFn,
}

impl std::fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportConfig")
            .field("source", &self.source)
            .field("batch_size", &self.batch_size)
            .field("max_concurrency", &self.max_concurrency)
            .field("target_batch_mb", &self.target_batch_mb)
            .field("min_batch_size", &self.min_batch_size)
            .field("csv", &self.csv)
            .finish_non_exhaustive()
    }
}

impl ImportConfig {
    /// Create a configuration with defaults for the given source path
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            batch_size: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            target_batch_mb: DEFAULT_TARGET_BATCH_MB,
            min_batch_size: DEFAULT_MIN_BATCH_SIZE,
            csv: CsvOptions::default(),
            transform: Arc::new(|record| record),
        }
    }

    /// Validate the configuration before the pipeline starts
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(ImportError::config("max concurrency must be at least 1"));
        }
        if self.batch_size == Some(0) {
            return Err(ImportError::config("batch size must be at least 1"));
        }
        if self.target_batch_mb <= 0.0 {
            return Err(ImportError::config(
                "target batch size must be a positive number of MB",
            ));
        }
        if self.min_batch_size == 0 {
            return Err(ImportError::config("minimum batch size must be at least 1"));
        }
        Ok(())
    }

    /// Resolve the source path into the list of input files.
    ///
    /// A directory yields its files sorted by name; a single file yields a
    /// one-element list. The pipeline consumes this list from the END
    /// (reverse order), so the list order here is not the processing order.
    pub fn resolve_files(&self) -> Result<Vec<PathBuf>> {
        let source = siphon_common::paths::normalize(&self.source.to_string_lossy())
            .map_err(|e| ImportError::config(e.to_string()))?;

        let metadata = std::fs::metadata(&source).map_err(|e| {
            ImportError::source_read(format!(
                "cannot read source path '{}': {}. Verify the path exists and you have read permissions.",
                source.display(),
                e
            ))
        })?;

        let mut files = if metadata.is_dir() {
            let mut entries = Vec::new();
            for entry in std::fs::read_dir(&source)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    entries.push(entry.path());
                }
            }
            entries
        } else {
            vec![source]
        };

        if files.is_empty() {
            return Err(ImportError::source_read(format!(
                "no input files found in '{}'",
                self.source.display()
            )));
        }

        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::new("./data");
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.min_batch_size, 100);
        assert!(config.batch_size.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_concurrency() {
        let mut config = ImportConfig::new("./data");
        config.max_concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_batch_size() {
        let mut config = ImportConfig::new("./data");
        config.batch_size = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_single_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[]").unwrap();

        let config = ImportConfig::new(file.path());
        let files = config.resolve_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0], file.path());
    }

    #[test]
    fn test_resolve_directory_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "c.csv"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }

        let config = ImportConfig::new(dir.path());
        let files = config.resolve_files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "c.csv"]);
    }

    #[test]
    fn test_resolve_missing_path_fails() {
        let config = ImportConfig::new("/nonexistent/path/records.json");
        assert!(matches!(
            config.resolve_files(),
            Err(ImportError::SourceRead(_))
        ));
    }

    #[test]
    fn test_resolve_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ImportConfig::new(dir.path());
        assert!(config.resolve_files().is_err());
    }
}
