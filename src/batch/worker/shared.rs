use crate::batch::queue::ItemQueue;
use crate::runtime::operation::BatchOperation;
use crate::runtime::progress::ProgressBoard;
use crate::runtime::telemetry::Telemetry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) struct WorkerShared<O: BatchOperation> {
    pub(super) queue: Arc<ItemQueue>,
    pub(super) board: Arc<ProgressBoard<O::Payload>>,
    pub(super) operation: Arc<O>,
    pub(super) telemetry: Arc<Telemetry>,
    pub(super) cancellation: CancellationToken,
}

pub(crate) struct WorkerSharedParams<O: BatchOperation> {
    pub queue: Arc<ItemQueue>,
    pub board: Arc<ProgressBoard<O::Payload>>,
    pub operation: Arc<O>,
    pub telemetry: Arc<Telemetry>,
    pub cancellation: CancellationToken,
}

impl<O: BatchOperation> WorkerShared<O> {
    pub(crate) fn new(params: WorkerSharedParams<O>) -> Self {
        Self {
            queue: params.queue,
            board: params.board,
            operation: params.operation,
            telemetry: params.telemetry,
            cancellation: params.cancellation,
        }
    }
}

impl<O: BatchOperation> Clone for WorkerShared<O> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            board: Arc::clone(&self.board),
            operation: Arc::clone(&self.operation),
            telemetry: Arc::clone(&self.telemetry),
            cancellation: self.cancellation.clone(),
        }
    }
}
