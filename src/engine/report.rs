use crate::batch::item::{ItemStatus, ResultRecord, WorkItem};
use crate::runtime::progress::StatusCounts;

/// Final reconciled outcome for one submitted item.
#[derive(Debug, Clone)]
pub struct ReportItem<P> {
    item: WorkItem,
    status: ItemStatus,
    record: Option<ResultRecord<P>>,
}

impl<P> ReportItem<P> {
    pub(crate) fn new(item: WorkItem, status: ItemStatus, record: Option<ResultRecord<P>>) -> Self {
        Self {
            item,
            status,
            record,
        }
    }

    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    pub fn record(&self) -> Option<&ResultRecord<P>> {
        self.record.as_ref()
    }

    pub fn payload(&self) -> Option<&P> {
        match &self.record {
            Some(ResultRecord::Success(payload)) => Some(payload),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.record {
            Some(ResultRecord::Failure(detail)) => Some(detail.as_str()),
            _ => None,
        }
    }
}

/// Immutable reconciled report for one completed batch run.
///
/// Produced by [`crate::BatchHandle::join`] once every item holds a terminal
/// status; items appear in submission (post-deduplication) order.
#[derive(Debug, Clone)]
pub struct BatchReport<P> {
    items: Vec<ReportItem<P>>,
    counts: StatusCounts,
    duplicates_removed: usize,
    was_cancelled: bool,
}

impl<P> BatchReport<P> {
    pub(crate) fn new(
        items: Vec<ReportItem<P>>,
        counts: StatusCounts,
        duplicates_removed: usize,
        was_cancelled: bool,
    ) -> Self {
        Self {
            items,
            counts,
            duplicates_removed,
            was_cancelled,
        }
    }

    pub fn items(&self) -> &[ReportItem<P>] {
        &self.items
    }

    pub fn counts(&self) -> StatusCounts {
        self.counts
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn duplicates_removed(&self) -> usize {
        self.duplicates_removed
    }

    pub fn was_cancelled(&self) -> bool {
        self.was_cancelled
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.items.is_empty() {
            return 1.0;
        }
        self.counts.terminal() as f64 / self.items.len() as f64
    }

    /// Failed items with their error details: enough for the caller to retry
    /// exactly that subset.
    pub fn failed_items(&self) -> Vec<(&WorkItem, &str)> {
        self.items
            .iter()
            .filter_map(|entry| entry.error_detail().map(|detail| (entry.item(), detail)))
            .collect()
    }

    /// Items swept or refused because of cancellation.
    pub fn cancelled_items(&self) -> Vec<&WorkItem> {
        self.items
            .iter()
            .filter(|entry| entry.status() == ItemStatus::Cancelled)
            .map(ReportItem::item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BatchReport<String> {
        let items = vec![
            ReportItem::new(
                WorkItem::new("a"),
                ItemStatus::Succeeded,
                Some(ResultRecord::Success("A".to_owned())),
            ),
            ReportItem::new(
                WorkItem::new("b"),
                ItemStatus::Failed,
                Some(ResultRecord::Failure("invalid".to_owned())),
            ),
            ReportItem::new(WorkItem::new("c"), ItemStatus::Cancelled, None),
        ];
        let counts = StatusCounts {
            pending: 0,
            processing: 0,
            succeeded: 1,
            failed: 1,
            cancelled: 1,
        };
        BatchReport::new(items, counts, 2, true)
    }

    #[test]
    fn failed_items_carry_retry_detail() {
        let report = report();
        let failed = report.failed_items();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0.as_str(), "b");
        assert_eq!(failed[0].1, "invalid");
    }

    #[test]
    fn accessors_expose_per_item_outcomes() {
        let report = report();
        assert_eq!(report.total(), 3);
        assert_eq!(report.duplicates_removed(), 2);
        assert!(report.was_cancelled());
        assert_eq!(report.progress_fraction(), 1.0);

        assert_eq!(report.items()[0].payload(), Some(&"A".to_owned()));
        assert_eq!(report.items()[0].error_detail(), None);
        assert_eq!(report.items()[2].record(), None);

        let cancelled = report.cancelled_items();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].as_str(), "c");
    }
}
