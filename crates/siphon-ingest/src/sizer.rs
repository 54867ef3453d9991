//! Batch-size estimation
//!
//! Reads a sample of records from the first input file, measures the average
//! serialized record size, and derives a batch size that keeps N concurrent
//! uploads near the target payload size. When measured upload throughput is
//! below the target, the estimate is scaled down proportionally. The result
//! is clamped to the configured floor.
//!
//! Estimation is skipped entirely when the caller supplies an explicit batch
//! size.

use crate::config::{CsvOptions, TransformFn};
use crate::error::{ImportError, Result};
use crate::record;
use crate::source::RecordSource;
use std::path::Path;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Serialized-size statistics for a record sample
#[derive(Debug, Clone, Copy)]
pub struct SampleStats {
    pub record_count: usize,
    pub total_bytes: usize,
}

impl SampleStats {
    /// Average serialized record size in MB
    pub fn average_record_mb(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_MB / self.record_count as f64
    }

    /// Average serialized record size in whole KB, rounded up for display
    pub fn average_record_kb(&self) -> u64 {
        (self.average_record_mb() * 1000.0).ceil() as u64
    }
}

/// Measure up to `limit` records from the head of one input file.
///
/// The transform is applied before measuring so the sample reflects what
/// will actually be uploaded. An empty sample is fatal: estimation cannot
/// proceed without data.
pub fn measure_sample(
    path: &Path,
    csv_options: &CsvOptions,
    transform: &TransformFn,
    limit: usize,
) -> Result<SampleStats> {
    let mut source = RecordSource::open(path, csv_options)?;

    let mut record_count = 0;
    let mut total_bytes = 0;
    while record_count < limit {
        let Some(next) = source.next_record() else {
            break;
        };
        let transformed = transform(next?);
        total_bytes += record::serialized_size(&transformed);
        record_count += 1;
    }

    if record_count == 0 {
        return Err(ImportError::source_read(format!(
            "'{}' contains no records to sample",
            path.display()
        )));
    }

    Ok(SampleStats {
        record_count,
        total_bytes,
    })
}

/// Derive the optimal batch size from sample statistics and measured
/// upload throughput.
pub fn estimate_batch_size(
    stats: &SampleStats,
    target_mb: f64,
    upload_speed_mb: f64,
    max_concurrency: usize,
    floor: usize,
) -> usize {
    let average_record_mb = stats.average_record_mb();
    let rough = target_mb / average_record_mb;
    // N concurrent batches together approximate the target payload
    let estimated = (rough / max_concurrency.max(1) as f64).floor();

    let batch_size = if upload_speed_mb >= target_mb {
        estimated
    } else {
        (upload_speed_mb / target_mb * estimated).floor()
    };

    (batch_size as usize).max(floor)
}
