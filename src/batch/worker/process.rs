use super::shared::WorkerShared;
use crate::batch::item::WorkItem;
use crate::runtime::operation::{BatchOperation, OperationError};
use futures::FutureExt;
use std::any::Any;

pub(crate) struct Worker<O: BatchOperation> {
    pub id: usize,
    shared: WorkerShared<O>,
}

impl<O: BatchOperation> Worker<O> {
    pub(crate) fn new(id: usize, shared: WorkerShared<O>) -> Self {
        Self { id, shared }
    }

    /// Claims and executes items until the queue is exhausted or cancellation
    /// is observed.
    ///
    /// Cancellation is consulted before every claim, never mid-operation: an
    /// item that has been claimed always runs its operation to completion and
    /// receives a real terminal state.
    #[tracing::instrument(name = "worker", skip_all, fields(worker = self.id))]
    pub(crate) async fn run(self) {
        tracing::debug!(worker = self.id, "worker task started");

        loop {
            if self.shared.cancellation.is_cancelled() {
                tracing::debug!(worker = self.id, "cancellation observed; no further claims");
                break;
            }

            let Some(index) = self.shared.queue.claim_next() else {
                tracing::debug!(worker = self.id, "queue exhausted");
                break;
            };

            // Claimed indices are always in range; Processing is entered
            // strictly before the operation is invoked.
            let item = self.shared.queue.items()[index].clone();
            self.shared.board.mark_processing(index);

            match execute_operation(self.shared.operation.as_ref(), item.clone()).await {
                Ok(payload) => {
                    self.shared.board.record_success(index, payload);
                    self.shared.telemetry.record_item_succeeded();
                }
                Err(error) => {
                    tracing::debug!(
                        worker = self.id,
                        item = %item,
                        error = %error,
                        "operation failed"
                    );
                    self.shared.board.record_failure(index, error.into_detail());
                    self.shared.telemetry.record_item_failed();
                }
            }
        }

        tracing::debug!(worker = self.id, "worker task exited");
    }
}

/// Invokes the injected operation exactly once for one item, normalizing a
/// panicking operation future into an [`OperationError`] so one bad item
/// never takes down its worker.
pub(crate) async fn execute_operation<O: BatchOperation>(
    operation: &O,
    item: WorkItem,
) -> Result<O::Payload, OperationError> {
    let future = operation.apply(item);
    match std::panic::AssertUnwindSafe(future).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => Err(OperationError::new(format!(
            "operation panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
