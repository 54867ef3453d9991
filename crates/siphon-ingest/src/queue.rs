//! Upload queue
//!
//! Dispatches batches to the destination with a hard bound on concurrent
//! uploads. Intake is a bounded channel sized to the concurrency limit, so a
//! producer that outruns the uploaders blocks in `enqueue` instead of piling
//! batches up in memory. Retry halves travel on a separate unbounded lane
//! that the dispatcher drains ahead of fresh intake; re-enqueued work can
//! never deadlock against a full intake channel.
//!
//! A non-retryable upload failure halts the dispatcher, and `finish` reports
//! it to the caller.

use crate::destination::Destination;
use crate::error::{ImportError, Result};
use crate::progress::ProgressReporter;
use crate::record::Record;
use crate::retry;
use crate::state::PipelineState;
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

/// One batch awaiting upload
#[derive(Debug)]
pub struct UploadTask {
    records: Vec<Record>,
    attempt: u32,
}

impl UploadTask {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            attempt: 0,
        }
    }

    pub(crate) fn with_attempt(records: Vec<Record>, attempt: u32) -> Self {
        Self { records, attempt }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// How many times ancestors of this task have been split
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Concurrency-bounded upload dispatcher
pub struct UploadQueue {
    intake: mpsc::Sender<UploadTask>,
    state: Arc<PipelineState>,
    dispatcher: tokio::task::JoinHandle<Result<()>>,
}

impl UploadQueue {
    /// Spawn the dispatcher for one pipeline run
    pub fn start(
        destination: Arc<dyn Destination>,
        state: Arc<PipelineState>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        // Intake capacity doubles as the backpressure bound
        let (intake_tx, intake_rx) = mpsc::channel(state.max_concurrency());
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();

        let dispatcher = tokio::spawn(dispatch(
            intake_rx,
            retry_rx,
            retry_tx,
            destination,
            Arc::clone(&state),
            progress,
        ));

        Self {
            intake: intake_tx,
            state,
            dispatcher,
        }
    }

    /// Enqueue one batch; waits when the queue is at capacity.
    ///
    /// Fails when the dispatcher has already halted on a fatal error; the
    /// root cause surfaces from [`UploadQueue::finish`].
    pub async fn enqueue(&self, records: Vec<Record>) -> Result<()> {
        self.state.tasks_enqueued(1);
        if self.intake.send(UploadTask::new(records)).await.is_err() {
            self.state.task_resolved();
            return Err(ImportError::Queue(
                "upload queue is no longer accepting batches".to_string(),
            ));
        }
        Ok(())
    }

    /// Close intake and wait for every outstanding task to resolve
    pub async fn finish(self) -> Result<()> {
        drop(self.intake);
        self.dispatcher
            .await
            .map_err(|e| ImportError::Queue(format!("dispatcher panicked: {e}")))?
    }
}

async fn dispatch(
    mut intake: mpsc::Receiver<UploadTask>,
    mut retries: mpsc::UnboundedReceiver<UploadTask>,
    retry_tx: mpsc::UnboundedSender<UploadTask>,
    destination: Arc<dyn Destination>,
    state: Arc<PipelineState>,
    progress: Arc<dyn ProgressReporter>,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(state.max_concurrency()));
    let mut workers: JoinSet<Result<()>> = JoinSet::new();
    let mut intake_open = true;

    loop {
        if !intake_open && state.pending() == 0 {
            break;
        }

        // Retry halves take priority over fresh intake so split work drains
        // while producers are held back by the bounded channel.
        tokio::select! {
            biased;
            Some(result) = workers.join_next(), if !workers.is_empty() => {
                joined(result)?;
            }
            Some(task) = retries.recv() => {
                spawn_upload(&mut workers, &semaphore, task, &destination, &state, &retry_tx, &progress).await?;
            }
            task = intake.recv(), if intake_open => {
                match task {
                    Some(task) => {
                        spawn_upload(&mut workers, &semaphore, task, &destination, &state, &retry_tx, &progress).await?;
                    }
                    None => intake_open = false,
                }
            }
        }
    }

    while let Some(result) = workers.join_next().await {
        joined(result)?;
    }
    Ok(())
}

async fn spawn_upload(
    workers: &mut JoinSet<Result<()>>,
    semaphore: &Arc<Semaphore>,
    task: UploadTask,
    destination: &Arc<dyn Destination>,
    state: &Arc<PipelineState>,
    retry_tx: &mpsc::UnboundedSender<UploadTask>,
    progress: &Arc<dyn ProgressReporter>,
) -> Result<()> {
    let permit = Arc::clone(semaphore)
        .acquire_owned()
        .await
        .map_err(|_| ImportError::Queue("upload semaphore closed".to_string()))?;

    workers.spawn(upload_worker(
        permit,
        task,
        Arc::clone(destination),
        Arc::clone(state),
        retry_tx.clone(),
        Arc::clone(progress),
    ));
    Ok(())
}

async fn upload_worker(
    permit: OwnedSemaphorePermit,
    task: UploadTask,
    destination: Arc<dyn Destination>,
    state: Arc<PipelineState>,
    retry_tx: mpsc::UnboundedSender<UploadTask>,
    progress: Arc<dyn ProgressReporter>,
) -> Result<()> {
    let _permit = permit;

    match destination.upload(task.records()).await {
        Ok(()) => {
            let total = state.record_imported(task.len());
            progress.update(&format!("Records indexed: {total}"));
            state.task_resolved();
            Ok(())
        }
        Err(err) if err.is_retryable() => {
            tracing::warn!(
                error = %err,
                batch_size = task.len(),
                attempt = task.attempt(),
                "retryable upload failure"
            );
            // Halves are enqueued before this task resolves
            retry::handle_retryable(task, &state, &retry_tx, progress.as_ref());
            state.task_resolved();
            Ok(())
        }
        Err(err) => {
            state.task_resolved();
            tracing::error!(error = %err, batch_size = task.len(), "upload failed");
            progress.warn(&format!("Import error: {err} {}", state.capacity_suggestions()));
            Err(ImportError::Upload(err))
        }
    }
}

fn joined(result: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    result.map_err(|e| ImportError::Queue(format!("upload worker panicked: {e}")))?
}
