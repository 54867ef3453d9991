//! Shared pipeline state
//!
//! One state object owns every counter mutated from multiple logical actors
//! (memory watchdog, retry coordinator, upload workers). It is shared via
//! `Arc` and uses atomics, so no actor ever holds a lock across an await.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-lifetime mutable state for one import run.
///
/// Invariants:
/// - `batch_size` never drops below the floor
/// - `retries` is monotonically non-decreasing
/// - `pending` counts unresolved upload tasks (queued plus in flight)
#[derive(Debug)]
pub struct PipelineState {
    batch_size: AtomicUsize,
    min_batch_size: usize,
    max_concurrency: usize,
    pending: AtomicUsize,
    imported: AtomicUsize,
    batches: AtomicUsize,
    retries: AtomicUsize,
    dropped: AtomicUsize,
}

impl PipelineState {
    /// Create state for a pipeline run.
    ///
    /// The effective floor is lowered to the initial batch size when the
    /// caller supplied an explicit size below the configured floor, so an
    /// explicit `--batch-size 10` is honored as-is.
    pub fn new(batch_size: usize, min_batch_size: usize, max_concurrency: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size: AtomicUsize::new(batch_size),
            min_batch_size: min_batch_size.clamp(1, batch_size),
            max_concurrency: max_concurrency.max(1),
            pending: AtomicUsize::new(0),
            imported: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Current batch-size limit; re-read by the batcher at every boundary
    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::SeqCst)
    }

    /// Minimum batch-size floor in effect for this run
    pub fn min_batch_size(&self) -> usize {
        self.min_batch_size
    }

    /// Concurrency limit for outstanding upload calls
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Halve the batch size, clamped to the floor. Returns (old, new).
    pub fn halve_batch_size(&self) -> (usize, usize) {
        let floor = self.min_batch_size;
        let old = self
            .batch_size
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some((cur / 2).max(floor))
            })
            .unwrap_or_else(|cur| cur);
        (old, (old / 2).max(floor))
    }

    /// Permanently shrink the batch size to `target` if it currently exceeds
    /// it, clamped to the floor. Returns the batch size now in effect.
    pub fn shrink_batch_size(&self, target: usize) -> usize {
        let floor = self.min_batch_size;
        let clamped = target.max(floor);
        let _ = self
            .batch_size
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                (cur > clamped).then_some(clamped)
            });
        self.batch_size()
    }

    /// Register `n` newly enqueued upload tasks
    pub fn tasks_enqueued(&self, n: usize) {
        self.pending.fetch_add(n, Ordering::SeqCst);
    }

    /// Register one resolved task (success, fatal, or abandonment)
    pub fn task_resolved(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// Unresolved tasks: queued plus in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Record a successfully uploaded batch; returns the cumulative record count
    pub fn record_imported(&self, records: usize) -> usize {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.imported.fetch_add(records, Ordering::SeqCst) + records
    }

    /// Cumulative imported-record count
    pub fn imported(&self) -> usize {
        self.imported.load(Ordering::SeqCst)
    }

    /// Number of successfully uploaded batches
    pub fn batches_uploaded(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Increment the global retry counter; returns the new value
    pub fn bump_retries(&self) -> usize {
        self.retries.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Cumulative retry count
    pub fn retries(&self) -> usize {
        self.retries.load(Ordering::SeqCst)
    }

    /// Record `n` records abandoned after retry exhaustion
    pub fn record_dropped(&self, n: usize) {
        self.dropped.fetch_add(n, Ordering::SeqCst);
    }

    /// Records lost to retry exhaustion
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Remediation guidance for capacity-related failures
    pub fn capacity_suggestions(&self) -> String {
        let mut output = format!(
            "Consider reducing the batch size (currently {}).",
            self.batch_size()
        );
        if self.max_concurrency > 1 {
            output.push_str(&format!(
                " Consider reducing max concurrency (currently {}).",
                self.max_concurrency
            ));
        }
        output
    }
}
