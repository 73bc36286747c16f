use crate::runtime::progress::ProgressBoard;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters used to derive runtime metrics.
#[derive(Default, Debug)]
pub struct Telemetry {
    batches_started: AtomicU64,
    batches_completed: AtomicU64,
    batches_cancelled: AtomicU64,
    items_succeeded: AtomicU64,
    items_failed: AtomicU64,
    items_cancelled: AtomicU64,
    duplicates_removed: AtomicU64,
    worker_pool_size: AtomicUsize,
}

impl Telemetry {
    pub fn record_batch_started(&self) {
        self.batches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_cancelled(&self) {
        self.batches_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_succeeded(&self) {
        self.items_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_failed(&self) {
        self.items_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_items_cancelled(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.items_cancelled.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_duplicates_removed(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.duplicates_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_worker_pool_size(&self, workers: usize) {
        self.worker_pool_size.store(workers, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            batches_started: self.batches_started.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            batches_cancelled: self.batches_cancelled.load(Ordering::Relaxed),
            items_succeeded: self.items_succeeded.load(Ordering::Relaxed),
            items_failed: self.items_failed.load(Ordering::Relaxed),
            items_cancelled: self.items_cancelled.load(Ordering::Relaxed),
            duplicates_removed: self.duplicates_removed.load(Ordering::Relaxed),
        }
    }

    pub fn items_succeeded(&self) -> u64 {
        self.items_succeeded.load(Ordering::Relaxed)
    }

    pub fn items_failed(&self) -> u64 {
        self.items_failed.load(Ordering::Relaxed)
    }

    pub fn items_cancelled(&self) -> u64 {
        self.items_cancelled.load(Ordering::Relaxed)
    }

    pub fn worker_pool_size(&self) -> usize {
        self.worker_pool_size.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TelemetrySnapshot {
    pub batches_started: u64,
    pub batches_completed: u64,
    pub batches_cancelled: u64,
    pub items_succeeded: u64,
    pub items_failed: u64,
    pub items_cancelled: u64,
    pub duplicates_removed: u64,
}

/// Spawns a background task that periodically logs item throughput and the
/// run's live status counts.
pub fn spawn_metrics_reporter<P: Send + 'static>(
    telemetry: Arc<Telemetry>,
    board: Arc<ProgressBoard<P>>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_terminal = 0u64;
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "proxybatch::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let counts = board.counts();
                    let terminal = counts.terminal() as u64;
                    let terminal_delta = terminal.saturating_sub(last_terminal);
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        terminal_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "proxybatch::metrics",
                        throughput = format!("{throughput:.2}"),
                        pending = counts.pending,
                        processing = counts.processing,
                        succeeded = counts.succeeded,
                        failed = counts.failed,
                        cancelled = counts.cancelled,
                        progress = format!("{:.2}", board.progress_fraction()),
                        items_succeeded_total = telemetry.items_succeeded(),
                        items_failed_total = telemetry.items_failed(),
                        "batch progress snapshot"
                    );

                    last_terminal = terminal;
                    last_tick = Instant::now();
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn telemetry_records_counters() {
        let telemetry = Telemetry::default();
        telemetry.record_batch_started();
        telemetry.record_item_succeeded();
        telemetry.record_item_succeeded();
        telemetry.record_item_failed();
        telemetry.record_items_cancelled(3);
        telemetry.record_items_cancelled(0);
        telemetry.record_duplicates_removed(2);
        telemetry.record_worker_pool_size(4);
        telemetry.record_batch_completed();

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.batches_started, 1);
        assert_eq!(snapshot.batches_completed, 1);
        assert_eq!(snapshot.batches_cancelled, 0);
        assert_eq!(snapshot.items_succeeded, 2);
        assert_eq!(snapshot.items_failed, 1);
        assert_eq!(snapshot.items_cancelled, 3);
        assert_eq!(snapshot.duplicates_removed, 2);
        assert_eq!(telemetry.worker_pool_size(), 4);
    }

    #[tokio::test]
    async fn metrics_reporter_logs_until_shutdown() {
        let telemetry = Arc::new(Telemetry::default());
        let board: Arc<ProgressBoard<u64>> = Arc::new(ProgressBoard::new(2));
        board.mark_processing(0);
        board.record_success(0, 7);

        let shutdown = CancellationToken::new();
        let handle = spawn_metrics_reporter(
            telemetry,
            board,
            shutdown.clone(),
            Duration::from_millis(10),
        );

        shutdown.cancel();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("reporter should stop promptly")
            .expect("task should not panic");
    }
}
