use crate::batch::item::WorkItem;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered, deduplicated list of work items with an atomically advancing
/// claim cursor.
///
/// Deduplication is exact-match on the raw input value and keeps the first
/// occurrence; the number of removed duplicates is retained so callers can
/// surface it to the submitter.
#[derive(Debug)]
pub struct ItemQueue {
    items: Vec<WorkItem>,
    cursor: AtomicUsize,
    duplicates_removed: usize,
}

impl ItemQueue {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut duplicates_removed = 0usize;

        for input in inputs {
            let raw = input.into();
            if seen.insert(raw.clone()) {
                items.push(WorkItem::new(raw));
            } else {
                duplicates_removed += 1;
            }
        }

        Self {
            items,
            cursor: AtomicUsize::new(0),
            duplicates_removed,
        }
    }

    /// Atomically claims the next unclaimed index, or `None` once every index
    /// has been handed out.
    ///
    /// Safe for concurrent invocation: no two callers ever receive the same
    /// index and no index is skipped. The cursor never advances past the item
    /// count, so exhaustion is stable under repeated calls.
    pub fn claim_next(&self) -> Option<usize> {
        self.cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |claimed| {
                if claimed < self.items.len() {
                    Some(claimed + 1)
                } else {
                    None
                }
            })
            .ok()
    }

    pub fn get(&self, index: usize) -> Option<&WorkItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn duplicates_removed(&self) -> usize {
        self.duplicates_removed
    }

    /// Number of indices handed out so far.
    pub fn claimed(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}
