use crate::batch::item::{ItemState, ItemStatus, ResultRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Shared store of per-index item state plus derived counters.
///
/// Each index is written by at most one worker (the queue's at-most-once
/// claim guarantee), so the per-slot locks only guard writes against
/// concurrent snapshot reads. There is no lock spanning the whole board.
#[derive(Debug)]
pub struct ProgressBoard<P> {
    slots: Vec<Mutex<ItemState<P>>>,
    counters: StatusCounters,
}

#[derive(Debug, Default)]
struct StatusCounters {
    pending: AtomicUsize,
    processing: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

/// Point-in-time derived counts for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn terminal(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    pub fn total(&self) -> usize {
        self.terminal() + self.pending + self.processing
    }
}

/// Owned snapshot of a run's live progress. Internally consistent: counts and
/// fraction are derived from the captured statuses, not re-read.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    statuses: Vec<ItemStatus>,
    counts: StatusCounts,
}

impl ProgressSnapshot {
    fn from_statuses(statuses: Vec<ItemStatus>) -> Self {
        let mut counts = StatusCounts {
            pending: 0,
            processing: 0,
            succeeded: 0,
            failed: 0,
            cancelled: 0,
        };
        for status in &statuses {
            match status {
                ItemStatus::Pending => counts.pending += 1,
                ItemStatus::Processing => counts.processing += 1,
                ItemStatus::Succeeded => counts.succeeded += 1,
                ItemStatus::Failed => counts.failed += 1,
                ItemStatus::Cancelled => counts.cancelled += 1,
            }
        }
        Self { statuses, counts }
    }

    pub fn statuses(&self) -> &[ItemStatus] {
        &self.statuses
    }

    pub fn counts(&self) -> StatusCounts {
        self.counts
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.statuses.is_empty() {
            return 1.0;
        }
        self.counts.terminal() as f64 / self.statuses.len() as f64
    }

    pub fn is_complete(&self) -> bool {
        self.counts.terminal() == self.statuses.len()
    }
}

impl<P> ProgressBoard<P> {
    pub(crate) fn new(total: usize) -> Self {
        let slots = (0..total).map(|_| Mutex::new(ItemState::Pending)).collect();
        let counters = StatusCounters::default();
        counters.pending.store(total, Ordering::Relaxed);
        Self { slots, counters }
    }

    pub fn total(&self) -> usize {
        self.slots.len()
    }

    /// Derived counts from the relaxed counters. Reflects the latest write
    /// each worker has committed; no stronger consistency is promised.
    pub fn counts(&self) -> StatusCounts {
        StatusCounts {
            pending: self.counters.pending.load(Ordering::Relaxed),
            processing: self.counters.processing.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            cancelled: self.counters.cancelled.load(Ordering::Relaxed),
        }
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.slots.is_empty() {
            return 1.0;
        }
        self.counts().terminal() as f64 / self.slots.len() as f64
    }

    pub fn status(&self, index: usize) -> Option<ItemStatus> {
        self.slots
            .get(index)
            .map(|slot| slot.lock().unwrap().status())
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let statuses = self
            .slots
            .iter()
            .map(|slot| slot.lock().unwrap().status())
            .collect();
        ProgressSnapshot::from_statuses(statuses)
    }

    pub(crate) fn mark_processing(&self, index: usize) {
        self.apply_transition(index, ItemState::Processing);
    }

    pub(crate) fn record_success(&self, index: usize, payload: P) {
        self.apply_transition(index, ItemState::Succeeded(payload));
    }

    pub(crate) fn record_failure(&self, index: usize, detail: String) {
        self.apply_transition(index, ItemState::Failed(detail));
    }

    /// Converts every still-pending item to `Cancelled`, returning how many
    /// were swept. Runs after all workers have exited, so no claim can race
    /// it.
    pub(crate) fn sweep_cancelled(&self) -> usize {
        let mut swept = 0usize;
        for slot in &self.slots {
            let mut state = slot.lock().unwrap();
            if matches!(&*state, ItemState::Pending) {
                *state = ItemState::Cancelled;
                self.counters.pending.fetch_sub(1, Ordering::Relaxed);
                self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                swept += 1;
            }
        }
        swept
    }

    // Indices come from the claim cursor, so they are always in range.
    fn apply_transition(&self, index: usize, next: ItemState<P>) {
        let mut slot = self.slots[index].lock().unwrap();
        let previous = slot.status();

        let source = match previous {
            ItemStatus::Pending => &self.counters.pending,
            ItemStatus::Processing => &self.counters.processing,
            ItemStatus::Succeeded | ItemStatus::Failed | ItemStatus::Cancelled => {
                tracing::warn!(
                    index,
                    from = ?previous,
                    to = ?next.status(),
                    "ignoring transition out of a terminal status"
                );
                return;
            }
        };
        let target = match next.status() {
            ItemStatus::Processing => &self.counters.processing,
            ItemStatus::Succeeded => &self.counters.succeeded,
            ItemStatus::Failed => &self.counters.failed,
            ItemStatus::Cancelled => &self.counters.cancelled,
            ItemStatus::Pending => {
                tracing::warn!(index, from = ?previous, "pending is never a transition target");
                return;
            }
        };

        source.fetch_sub(1, Ordering::Relaxed);
        target.fetch_add(1, Ordering::Relaxed);
        *slot = next;
    }
}

impl<P: Clone> ProgressBoard<P> {
    /// Per-index status and record pairs, for report assembly.
    pub(crate) fn states(&self) -> Vec<(ItemStatus, Option<ResultRecord<P>>)> {
        self.slots
            .iter()
            .map(|slot| {
                let state = slot.lock().unwrap();
                (state.status(), state.record())
            })
            .collect()
    }
}
