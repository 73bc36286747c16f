use super::process::execute_operation;
use super::*;
use crate::batch::item::ItemStatus;
use crate::batch::queue::ItemQueue;
use crate::runtime::operation::{BatchOperation, FnOperation, OperationError};
use crate::runtime::progress::ProgressBoard;
use crate::runtime::telemetry::Telemetry;
use crate::WorkItem;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

fn shared_for<O: BatchOperation>(
    queue: Arc<ItemQueue>,
    operation: O,
    cancellation: CancellationToken,
) -> (WorkerShared<O>, Arc<ProgressBoard<O::Payload>>) {
    let board = Arc::new(ProgressBoard::new(queue.len()));
    let shared = WorkerShared::new(WorkerSharedParams {
        queue,
        board: board.clone(),
        operation: Arc::new(operation),
        telemetry: Arc::new(Telemetry::default()),
        cancellation,
    });
    (shared, board)
}

#[tokio::test]
async fn worker_drains_the_queue_and_records_outcomes() {
    let queue = Arc::new(ItemQueue::new(["ok-1", "bad", "ok-2"]));
    let operation = FnOperation::new(|item: WorkItem| async move {
        if item.as_str() == "bad" {
            Err(OperationError::new("rejected"))
        } else {
            Ok(item.as_str().to_uppercase())
        }
    });
    let (shared, board) = shared_for(queue.clone(), operation, CancellationToken::new());

    Worker::new(0, shared).run().await;

    assert_eq!(queue.claimed(), 3);
    assert_eq!(board.status(0), Some(ItemStatus::Succeeded));
    assert_eq!(board.status(1), Some(ItemStatus::Failed));
    assert_eq!(board.status(2), Some(ItemStatus::Succeeded));

    let states = board.states();
    assert_eq!(
        states[1].1,
        Some(crate::ResultRecord::Failure("rejected".to_owned()))
    );
}

#[tokio::test]
async fn worker_stops_claiming_once_cancelled() {
    let queue = Arc::new(ItemQueue::new(["a", "b", "c"]));
    let cancellation = CancellationToken::new();
    let operation =
        FnOperation::new(|item: WorkItem| async move { Ok::<_, OperationError>(item.into_string()) });
    let (shared, board) = shared_for(queue.clone(), operation, cancellation.clone());

    cancellation.cancel();
    Worker::new(0, shared).run().await;

    assert_eq!(queue.claimed(), 0, "a cancelled worker must not claim");
    assert_eq!(board.counts().pending, 3);
}

#[tokio::test]
async fn worker_updates_shared_telemetry() {
    let queue = Arc::new(ItemQueue::new(["x", "y"]));
    let operation = FnOperation::new(|item: WorkItem| async move {
        if item.as_str() == "y" {
            Err(OperationError::new("nope"))
        } else {
            Ok(())
        }
    });
    let board = Arc::new(ProgressBoard::new(queue.len()));
    let telemetry = Arc::new(Telemetry::default());
    let shared = WorkerShared::new(WorkerSharedParams {
        queue,
        board,
        operation: Arc::new(operation),
        telemetry: telemetry.clone(),
        cancellation: CancellationToken::new(),
    });

    Worker::new(3, shared).run().await;

    assert_eq!(telemetry.items_succeeded(), 1);
    assert_eq!(telemetry.items_failed(), 1);
}

#[tokio::test]
async fn two_workers_share_the_claim_cursor() {
    let inputs: Vec<String> = (0..40).map(|n| format!("acct-{n}")).collect();
    let queue = Arc::new(ItemQueue::new(inputs));
    let operation = FnOperation::new(|item: WorkItem| async move {
        tokio::task::yield_now().await;
        Ok::<_, OperationError>(item.into_string())
    });
    let (shared, board) = shared_for(queue.clone(), operation, CancellationToken::new());

    let first = tokio::spawn(Worker::new(0, shared.clone()).run());
    let second = tokio::spawn(Worker::new(1, shared).run());

    timeout(Duration::from_secs(5), async {
        first.await.expect("worker 0 should not panic");
        second.await.expect("worker 1 should not panic");
    })
    .await
    .expect("workers should drain the queue promptly");

    let counts = board.counts();
    assert_eq!(counts.succeeded, 40);
    assert_eq!(counts.terminal(), 40);
    assert_eq!(queue.claimed(), 40);
}

#[tokio::test]
async fn executor_normalizes_panics_into_failures() {
    let operation = FnOperation::new(|item: WorkItem| async move {
        if item.as_str() == "boom" {
            panic!("credential parser blew up");
        }
        Ok::<_, OperationError>(item.into_string())
    });

    let outcome = execute_operation(&operation, WorkItem::new("boom")).await;
    let error = outcome.expect_err("panicking operation must fail");
    assert!(
        error.detail().contains("operation panicked"),
        "detail should flag the panic: {}",
        error.detail()
    );
    assert!(error.detail().contains("credential parser blew up"));

    let outcome = execute_operation(&operation, WorkItem::new("fine")).await;
    assert_eq!(outcome.expect("non-panicking item succeeds"), "fine");
}
