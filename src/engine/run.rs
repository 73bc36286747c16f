//! Batch run orchestration.
//!
//! `BatchEngine` composes the leaf components so callers interact with a
//! single submission API while implementation details live in the focused
//! modules:
//! - `batch::queue` owns deduplication and the atomic claim cursor.
//! - `batch::worker` owns the claim-and-execute loop.
//! - `engine::pool` owns worker task creation and the workers-done signal.
//! - `runtime::progress` owns per-item state and derived counts.
//!
//! Each submission produces a fresh, isolated run: a `BatchHandle` for live
//! progress and cancellation, and a `BatchReport` once the run drains.

use super::pool::WorkerPool;
use super::report::{BatchReport, ReportItem};
use crate::batch::item::WorkItem;
use crate::batch::queue::ItemQueue;
use crate::batch::worker::{WorkerShared, WorkerSharedParams};
use crate::runtime::config::EngineConfig;
use crate::runtime::operation::BatchOperation;
use crate::runtime::progress::{ProgressBoard, ProgressSnapshot, StatusCounts};
use crate::runtime::telemetry::{self, Telemetry};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Submission rejected synchronously, before any worker task starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    InvalidConcurrency { requested: usize },
    EmptyBatch,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::InvalidConcurrency { requested } => {
                write!(
                    f,
                    "requested concurrency {requested} is invalid; at least one worker is required"
                )
            }
            SubmitError::EmptyBatch => {
                write!(f, "batch contains no items after deduplication")
            }
        }
    }
}

impl std::error::Error for SubmitError {}

/// Applies one injected remote operation to every item of submitted batches.
///
/// The engine is constructed once per operation type (credential add, account
/// status refresh, ...) and hands out a fresh [`BatchHandle`] per submission;
/// runs never share state beyond process-wide telemetry.
pub struct BatchEngine<O: BatchOperation> {
    config: EngineConfig,
    operation: Arc<O>,
    telemetry: Arc<Telemetry>,
}

impl<O: BatchOperation> BatchEngine<O> {
    pub fn new(config: EngineConfig, operation: O) -> Self {
        Self {
            config,
            operation: Arc::new(operation),
            telemetry: Arc::new(Telemetry::default()),
        }
    }

    /// Returns a reference to the engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns a clone of the telemetry handle for observability.
    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Submits a batch using the engine's configured concurrency.
    pub fn submit<I, S>(&self, inputs: I) -> Result<BatchHandle<O::Payload>, SubmitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submit_with_concurrency(inputs, self.config.concurrency())
    }

    /// Submits a batch with an explicit concurrency level.
    ///
    /// Rejects zero concurrency and batches that deduplicate to nothing
    /// before any worker task is spawned. The effective pool size is
    /// `min(concurrency, item_count)`. Must be called from within a Tokio
    /// runtime; worker tasks are spawned on the current one.
    pub fn submit_with_concurrency<I, S>(
        &self,
        inputs: I,
        concurrency: usize,
    ) -> Result<BatchHandle<O::Payload>, SubmitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if concurrency == 0 {
            return Err(SubmitError::InvalidConcurrency {
                requested: concurrency,
            });
        }

        let queue = Arc::new(ItemQueue::new(inputs));
        if queue.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }

        let board = Arc::new(ProgressBoard::new(queue.len()));
        let cancellation = CancellationToken::new();
        let worker_count = WorkerPool::size_for(concurrency, queue.len());

        self.telemetry.record_batch_started();
        self.telemetry
            .record_duplicates_removed(queue.duplicates_removed() as u64);
        self.telemetry.record_worker_pool_size(worker_count);

        tracing::info!(
            items = queue.len(),
            duplicates_removed = queue.duplicates_removed(),
            workers = worker_count,
            "starting batch run"
        );

        let shared = WorkerShared::new(WorkerSharedParams {
            queue: queue.clone(),
            board: board.clone(),
            operation: self.operation.clone(),
            telemetry: self.telemetry.clone(),
            cancellation: cancellation.clone(),
        });
        let pool = WorkerPool::launch(shared, worker_count);

        // The reporter outlives cancellation of the run (in-flight items still
        // finish); it is stopped by the completion task once the run drains.
        let reporter_token = CancellationToken::new();
        let reporter_handle = telemetry::spawn_metrics_reporter(
            self.telemetry.clone(),
            board.clone(),
            reporter_token.clone(),
            self.config.metrics_interval(),
        );

        let (done_tx, done_rx) = watch::channel(false);
        let completion = Self::spawn_completion_task(CompletionParams {
            pool,
            board: board.clone(),
            telemetry: self.telemetry.clone(),
            cancellation: cancellation.clone(),
            reporter_token,
            reporter_handle,
            done_tx,
        });

        Ok(BatchHandle {
            queue,
            board,
            cancellation,
            done_rx,
            completion,
        })
    }

    /// Supervises one run to completion: waits for every worker to exit, runs
    /// the cancellation sweep exactly once (never concurrently with claims),
    /// stops the reporter, and signals the done channel.
    fn spawn_completion_task(params: CompletionParams<O::Payload>) -> JoinHandle<()> {
        let CompletionParams {
            pool,
            board,
            telemetry,
            cancellation,
            reporter_token,
            reporter_handle,
            done_tx,
        } = params;

        let mut workers_done_rx = pool.workers_done();
        let worker_handles = pool.into_handles();

        tokio::spawn(async move {
            while !*workers_done_rx.borrow_and_update() {
                if workers_done_rx.changed().await.is_err() {
                    break;
                }
            }

            let results = join_all(worker_handles).await;
            for (worker_id, result) in results.into_iter().enumerate() {
                if let Err(err) = result {
                    tracing::warn!(
                        worker = worker_id,
                        error = %err,
                        "worker task terminated unexpectedly"
                    );
                }
            }

            let swept = board.sweep_cancelled();
            if swept > 0 {
                telemetry.record_items_cancelled(swept as u64);
                tracing::info!(swept, "swept unclaimed items to cancelled");
            }

            if cancellation.is_cancelled() {
                telemetry.record_batch_cancelled();
            }
            telemetry.record_batch_completed();

            reporter_token.cancel();
            if let Err(err) = reporter_handle.await {
                tracing::warn!(error = %err, "metrics reporter task panicked");
            }

            let counts = board.counts();
            tracing::info!(
                succeeded = counts.succeeded,
                failed = counts.failed,
                cancelled = counts.cancelled,
                "batch run complete"
            );

            let _ = done_tx.send(true);
        })
    }
}

struct CompletionParams<P> {
    pool: WorkerPool,
    board: Arc<ProgressBoard<P>>,
    telemetry: Arc<Telemetry>,
    cancellation: CancellationToken,
    reporter_token: CancellationToken,
    reporter_handle: JoinHandle<()>,
    done_tx: watch::Sender<bool>,
}

/// Live surface of one batch run: progress snapshots, cancellation, and
/// completion.
///
/// Dropping the handle does not abort the run; workers drain and the sweep
/// still executes. [`BatchHandle::join`] consumes the handle and assembles
/// the final [`BatchReport`].
pub struct BatchHandle<P> {
    queue: Arc<ItemQueue>,
    board: Arc<ProgressBoard<P>>,
    cancellation: CancellationToken,
    done_rx: watch::Receiver<bool>,
    completion: JoinHandle<()>,
}

impl<P> BatchHandle<P> {
    /// Items actually run, in submission order after deduplication.
    pub fn items(&self) -> &[WorkItem] {
        self.queue.items()
    }

    pub fn total_items(&self) -> usize {
        self.queue.len()
    }

    pub fn duplicates_removed(&self) -> usize {
        self.queue.duplicates_removed()
    }

    /// Cheap derived counts; see [`ProgressBoard::counts`] for the
    /// consistency contract.
    pub fn counts(&self) -> StatusCounts {
        self.board.counts()
    }

    /// Owned, internally consistent snapshot of per-item statuses.
    pub fn progress(&self) -> ProgressSnapshot {
        self.board.snapshot()
    }

    pub fn progress_fraction(&self) -> f64 {
        self.board.progress_fraction()
    }

    /// Requests cancellation: no new items are claimed; items already in
    /// flight run to completion and keep their real terminal state.
    /// Idempotent.
    pub fn cancel(&self) {
        if !self.cancellation.is_cancelled() {
            tracing::info!("batch cancellation requested");
        }
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Waits until every worker has exited and the cancellation sweep has
    /// run. This is the only reliable "cancelled and drained" signal; the
    /// cancellation call itself returns immediately.
    pub async fn wait_done(&self) {
        let mut done_rx = self.done_rx.clone();
        loop {
            if *done_rx.borrow_and_update() {
                return;
            }
            if done_rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl<P: Clone> BatchHandle<P> {
    /// Awaits completion and assembles the final reconciled report.
    pub async fn join(self) -> Result<BatchReport<P>> {
        self.completion
            .await
            .context("batch completion task panicked")?;

        let states = self.board.states();
        let entries = self
            .queue
            .items()
            .iter()
            .cloned()
            .zip(states)
            .map(|(item, (status, record))| ReportItem::new(item, status, record))
            .collect();

        Ok(BatchReport::new(
            entries,
            self.board.counts(),
            self.queue.duplicates_removed(),
            self.cancellation.is_cancelled(),
        ))
    }
}
