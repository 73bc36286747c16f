use crate::batch::worker::{panic_message, Worker, WorkerShared};
use crate::runtime::operation::BatchOperation;
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fixed-size pool of worker tasks for one batch run.
///
/// The pool owns the task handles; the last worker to exit flips the
/// workers-done watch channel so the completion supervisor can run the
/// cancellation sweep without polling.
pub(crate) struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    workers_done_rx: watch::Receiver<bool>,
}

impl WorkerPool {
    /// Effective pool size for a run: never more workers than items.
    /// Submission validation guarantees both arguments are nonzero.
    pub(crate) fn size_for(requested: usize, item_count: usize) -> usize {
        requested.min(item_count)
    }

    pub(crate) fn launch<O: BatchOperation>(shared: WorkerShared<O>, worker_count: usize) -> Self {
        let (workers_done_tx, workers_done_rx) = watch::channel(false);
        let remaining_workers = Arc::new(AtomicUsize::new(worker_count));
        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let worker = Worker::new(worker_id, shared.clone());
            let workers_done = workers_done_tx.clone();
            let remaining_workers = remaining_workers.clone();

            workers.push(tokio::spawn(async move {
                let result = std::panic::AssertUnwindSafe(worker.run())
                    .catch_unwind()
                    .await;

                if let Err(panic_payload) = result {
                    // Operation panics are caught per item; this path only
                    // fires on an engine bug. Sibling workers keep draining.
                    tracing::error!(
                        worker = worker_id,
                        panic = %panic_message(panic_payload.as_ref()),
                        "worker task panicked"
                    );
                }

                if remaining_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
                    let _ = workers_done.send(true);
                }
            }));
        }

        if workers.is_empty() {
            let _ = workers_done_tx.send(true);
        }

        Self {
            workers,
            workers_done_rx,
        }
    }

    pub(crate) fn workers_done(&self) -> watch::Receiver<bool> {
        self.workers_done_rx.clone()
    }

    pub(crate) fn into_handles(self) -> Vec<JoinHandle<()>> {
        self.workers
    }
}
