//! Pipeline orchestration
//!
//! Wires the stages together for one import run: resolve input files, settle
//! on a batch size (explicit or estimated), then stream each file through the
//! batcher into the upload queue. Files are consumed from the end of the
//! sorted list; that reverse order is the documented contract, not an
//! accident of implementation.
//!
//! Interrupting the process abandons in-flight uploads; there is no partial
//! checkpoint to resume from.

use crate::batcher::Batcher;
use crate::config::{ImportConfig, SAMPLE_SIZE};
use crate::destination::Destination;
use crate::error::Result;
use crate::memory::{MemorySampler, MemoryWatchdog};
use crate::probe::NetworkProbe;
use crate::progress::ProgressReporter;
use crate::queue::UploadQueue;
use crate::sizer;
use crate::source::RecordSource;
use crate::state::PipelineState;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome counters for one completed import run
#[derive(Debug, Clone, Copy)]
pub struct ImportSummary {
    pub records_imported: usize,
    pub batches_uploaded: usize,
    pub retries: usize,
    pub records_dropped: usize,
    pub final_batch_size: usize,
}

/// Run one import end to end.
///
/// When `config.batch_size` is set, estimation and the network probe are
/// skipped entirely. A fatal upload failure or unreadable source aborts the
/// run; records dropped by retry exhaustion do not.
pub async fn run(
    config: ImportConfig,
    destination: Arc<dyn Destination>,
    probe: &dyn NetworkProbe,
    memory: Box<dyn MemorySampler>,
    progress: Arc<dyn ProgressReporter>,
) -> Result<ImportSummary> {
    config.validate()?;
    let mut files = config.resolve_files()?;
    tracing::info!(file_count = files.len(), "resolved input files");

    let batch_size = match config.batch_size {
        Some(size) => size,
        None => estimate(&config, &files, probe, progress.as_ref()).await?,
    };

    let state = Arc::new(PipelineState::new(
        batch_size,
        config.min_batch_size,
        config.max_concurrency,
    ));
    let watchdog = MemoryWatchdog::new(memory);
    let queue = UploadQueue::start(destination, Arc::clone(&state), Arc::clone(&progress));

    let feed_result = feed_files(&config, &mut files, &state, &watchdog, &queue, progress.as_ref()).await;
    let queue_result = queue.finish().await;

    // A queue fatal is the root cause even when the feeder failed first
    // (its enqueue fails once the dispatcher halts).
    queue_result?;
    feed_result?;

    let summary = ImportSummary {
        records_imported: state.imported(),
        batches_uploaded: state.batches_uploaded(),
        retries: state.retries(),
        records_dropped: state.dropped(),
        final_batch_size: state.batch_size(),
    };
    tracing::info!(
        records_imported = summary.records_imported,
        batches_uploaded = summary.batches_uploaded,
        retries = summary.retries,
        records_dropped = summary.records_dropped,
        "import complete"
    );
    Ok(summary)
}

/// Sample the first file and probe the network to pick a batch size
async fn estimate(
    config: &ImportConfig,
    files: &[PathBuf],
    probe: &dyn NetworkProbe,
    progress: &dyn ProgressReporter,
) -> Result<usize> {
    progress.update("Estimating data size...");
    let stats = sizer::measure_sample(&files[0], &config.csv, &config.transform, SAMPLE_SIZE)?;
    progress.println(&format!(
        "Average record size: {} Kb",
        stats.average_record_kb()
    ));

    progress.update("Testing network speed...");
    let speed = probe.upload_speed_mb().await?;
    progress.println(&format!("Upload speed: {speed:.2} MB/s"));

    let size = sizer::estimate_batch_size(
        &stats,
        config.target_batch_mb,
        speed,
        config.max_concurrency,
        config.min_batch_size,
    );
    progress.println(&format!("Optimal batch size: {size}"));
    tracing::info!(
        batch_size = size,
        upload_speed_mb = speed,
        sample_records = stats.record_count,
        "batch size estimated"
    );
    Ok(size)
}

/// Stream every input file through the batcher into the queue.
///
/// `files` is sorted ascending; `pop` consumes it from the end.
async fn feed_files(
    config: &ImportConfig,
    files: &mut Vec<PathBuf>,
    state: &PipelineState,
    watchdog: &MemoryWatchdog,
    queue: &UploadQueue,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    while let Some(path) = files.pop() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        progress.println(&format!("Importing [{name}]"));
        tracing::info!(file = %path.display(), "importing file");

        let mut source = RecordSource::open(&path, &config.csv)?;
        let mut batcher = Batcher::new(state);

        while let Some(next) = source.next_record() {
            let record = (config.transform)(next?);
            if let Some(batch) = batcher.push(record) {
                watchdog.check(state, progress);
                queue.enqueue(batch).await?;
            }
        }
        // Each file flushes its own partial batch
        if let Some(batch) = batcher.finish() {
            watchdog.check(state, progress);
            queue.enqueue(batch).await?;
        }
    }
    progress.println("Done reading files");
    Ok(())
}
