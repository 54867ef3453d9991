//! Retry coordinator
//!
//! Timeout-class upload failures are handled by splitting the failed batch in
//! half and re-enqueuing both halves, on the theory that the batch was too
//! large for the connection. Each split also shrinks the global batch-size
//! limit so future batches start smaller. A global retry counter with an
//! adaptive ceiling bounds the total amount of re-work; past the ceiling the
//! batch is abandoned and its records counted as dropped.

use crate::progress::ProgressReporter;
use crate::queue::UploadTask;
use crate::record::Record;
use crate::state::PipelineState;
use tokio::sync::mpsc;

/// Minimum retry ceiling, independent of progress made so far
pub const RETRY_FLOOR: usize = 15;

/// What the coordinator did with a failed batch
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RetryOutcome {
    /// Split into halves and re-enqueued
    Requeued,
    /// Retry ceiling exceeded; records dropped
    Abandoned,
}

/// Retry ceiling for the current run: scales with the number of batches
/// already imported, never below the floor. The batch count is measured at
/// the current batch size, so a mid-run shrink raises the ceiling.
pub fn retry_ceiling(imported_batches: usize) -> usize {
    RETRY_FLOOR.max(imported_batches / 2)
}

/// Split a batch into halves, first half taking the extra record when the
/// count is odd. Order is preserved across the split point.
pub fn split_records(mut records: Vec<Record>) -> (Vec<Record>, Vec<Record>) {
    let mid = records.len().div_ceil(2);
    let second = records.split_off(mid);
    (records, second)
}

/// Handle a timeout-class failure for one batch.
///
/// Both halves are enqueued (and counted as pending) before the caller
/// resolves the original task, so the pending count never touches zero while
/// work remains.
pub(crate) fn handle_retryable(
    task: UploadTask,
    state: &PipelineState,
    retry_tx: &mpsc::UnboundedSender<UploadTask>,
    progress: &dyn ProgressReporter,
) -> RetryOutcome {
    let retry_count = state.bump_retries();
    let imported_batches = state.imported() / state.batch_size().max(1);
    let ceiling = retry_ceiling(imported_batches);

    if retry_count > ceiling {
        let lost = task.len();
        state.record_dropped(lost);
        tracing::error!(
            records_lost = lost,
            retry_count,
            ceiling,
            "retry limit reached, abandoning batch"
        );
        progress.warn(&format!(
            "Error: failed to index data after {} retries; dropping {} record(s). {}",
            retry_count - 1,
            lost,
            state.capacity_suggestions()
        ));
        return RetryOutcome::Abandoned;
    }

    progress.println(&format!("({retry_count}) Retrying with smaller batches..."));

    let attempt = task.attempt() + 1;
    let (first, second) = split_records(task.into_records());
    let midpoint = first.len();

    // Future batches start at the reduced size; the shrink is permanent.
    if state.batch_size() > midpoint {
        let new = state.shrink_batch_size(midpoint);
        tracing::debug!(new_batch_size = new, "batch size reduced after timeout");
    }

    for half in [first, second] {
        if half.is_empty() {
            continue;
        }
        state.tasks_enqueued(1);
        if retry_tx.send(UploadTask::with_attempt(half, attempt)).is_err() {
            // Dispatcher already unwinding with a fatal error.
            state.task_resolved();
        }
    }
    RetryOutcome::Requeued
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::progress::NoopProgress;
    use serde_json::json;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let mut r = Record::new();
                r.insert("id".to_string(), json!(i));
                r
            })
            .collect()
    }

    #[test]
    fn test_ceiling_floor_and_scaling() {
        assert_eq!(retry_ceiling(0), 15);
        assert_eq!(retry_ceiling(29), 15);
        assert_eq!(retry_ceiling(30), 15);
        assert_eq!(retry_ceiling(31), 15);
        assert_eq!(retry_ceiling(100), 50);
    }

    #[test]
    fn test_split_odd_count_first_half_larger() {
        let (first, second) = split_records(records(7));
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 3);
        // Order preserved across the split point
        assert_eq!(first[0]["id"], json!(0));
        assert_eq!(second[0]["id"], json!(4));
        assert_eq!(second[2]["id"], json!(6));
    }

    #[test]
    fn test_split_single_record() {
        let (first, second) = split_records(records(1));
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_requeue_splits_and_shrinks() {
        let state = PipelineState::new(100, 10, 2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        state.tasks_enqueued(1);
        let outcome = handle_retryable(
            UploadTask::new(records(100)),
            &state,
            &tx,
            &NoopProgress,
        );
        assert_eq!(outcome, RetryOutcome::Requeued);

        // Two halves enqueued, original still pending until the caller resolves
        assert_eq!(state.pending(), 3);
        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.len(), 50);
        assert_eq!(second.len(), 50);
        assert_eq!(first.attempt(), 1);

        // The global limit shrank to the half size
        assert_eq!(state.batch_size(), 50);
        assert_eq!(state.retries(), 1);
    }

    #[test]
    fn test_single_record_batch_requeues_whole() {
        let state = PipelineState::new(10, 1, 2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        state.tasks_enqueued(1);
        let outcome =
            handle_retryable(UploadTask::new(records(1)), &state, &tx, &NoopProgress);
        assert_eq!(outcome, RetryOutcome::Requeued);

        // Only the non-empty half is enqueued
        assert_eq!(state.pending(), 2);
        assert_eq!(rx.try_recv().unwrap().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ceiling_exceeded_abandons_and_counts_dropped() {
        let state = PipelineState::new(100, 10, 2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Exhaust the ceiling: 15 prior retries with no imported batches
        for _ in 0..15 {
            state.bump_retries();
        }
        state.tasks_enqueued(1);
        let outcome = handle_retryable(
            UploadTask::new(records(40)),
            &state,
            &tx,
            &NoopProgress,
        );
        assert_eq!(outcome, RetryOutcome::Abandoned);
        assert_eq!(state.dropped(), 40);
        assert!(rx.try_recv().is_err());
        // The abandoned task stays pending until the caller resolves it
        assert_eq!(state.pending(), 1);
    }

    #[test]
    fn test_sixteenth_retry_abandons_at_thirty_batches() {
        // 3000 records at batch size 100 is 30 imported batches; the
        // ceiling stays at its floor of 15 and the 16th retry abandons.
        let state = PipelineState::new(100, 10, 2);
        let (tx, _rx) = mpsc::unbounded_channel();

        for _ in 0..30 {
            state.record_imported(100);
        }
        for _ in 0..15 {
            state.bump_retries();
        }
        let outcome = handle_retryable(
            UploadTask::new(records(8)),
            &state,
            &tx,
            &NoopProgress,
        );
        assert_eq!(outcome, RetryOutcome::Abandoned);
    }

    #[test]
    fn test_imported_records_raise_the_ceiling() {
        let state = PipelineState::new(100, 10, 2);
        let (tx, _rx) = mpsc::unbounded_channel();

        // 3400 records at batch size 100 is 34 imported batches, ceiling 17
        for _ in 0..34 {
            state.record_imported(100);
        }
        for _ in 0..16 {
            state.bump_retries();
        }
        // 17th retry is still under the raised ceiling
        let outcome = handle_retryable(
            UploadTask::new(records(4)),
            &state,
            &tx,
            &NoopProgress,
        );
        assert_eq!(outcome, RetryOutcome::Requeued);
    }

    #[test]
    fn test_ceiling_tracks_shrunken_batch_size() {
        // The imported-batch count divides by the CURRENT batch size: after
        // 3000 records import and the batch size shrinks to 10, the count is
        // 300 and the ceiling 150, so a 20th retry keeps going.
        let state = PipelineState::new(100, 10, 2);
        let (tx, _rx) = mpsc::unbounded_channel();

        for _ in 0..30 {
            state.record_imported(100);
        }
        state.shrink_batch_size(10);
        for _ in 0..19 {
            state.bump_retries();
        }
        let outcome = handle_retryable(
            UploadTask::new(records(8)),
            &state,
            &tx,
            &NoopProgress,
        );
        assert_eq!(outcome, RetryOutcome::Requeued);
        assert_eq!(state.dropped(), 0);
    }
}
