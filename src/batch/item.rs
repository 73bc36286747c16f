use std::fmt;

/// One unit of input to a batch run: a raw credential string or an account
/// identifier. Opaque to the engine and immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    raw: String,
}

impl WorkItem {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<String> for WorkItem {
    fn from(raw: String) -> Self {
        Self { raw }
    }
}

impl From<&str> for WorkItem {
    fn from(raw: &str) -> Self {
        Self { raw: raw.to_owned() }
    }
}

/// Observable status of one item. `Succeeded`, `Failed`, and `Cancelled` are
/// terminal and never overwritten once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ItemStatus::Succeeded | ItemStatus::Failed | ItemStatus::Cancelled
        )
    }
}

/// Terminal record attached to an item: the operation's payload on success, a
/// human-readable error detail on failure. Cancelled items carry no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultRecord<P> {
    Success(P),
    Failure(String),
}

/// Full per-slot state tracked by the progress board.
///
/// `Succeeded` always owns a payload and `Failed` always owns an error
/// detail, so the record invariants hold by construction.
#[derive(Debug, Clone)]
pub(crate) enum ItemState<P> {
    Pending,
    Processing,
    Succeeded(P),
    Failed(String),
    Cancelled,
}

impl<P> ItemState<P> {
    pub(crate) fn status(&self) -> ItemStatus {
        match self {
            ItemState::Pending => ItemStatus::Pending,
            ItemState::Processing => ItemStatus::Processing,
            ItemState::Succeeded(_) => ItemStatus::Succeeded,
            ItemState::Failed(_) => ItemStatus::Failed,
            ItemState::Cancelled => ItemStatus::Cancelled,
        }
    }
}

impl<P: Clone> ItemState<P> {
    pub(crate) fn record(&self) -> Option<ResultRecord<P>> {
        match self {
            ItemState::Succeeded(payload) => Some(ResultRecord::Success(payload.clone())),
            ItemState::Failed(detail) => Some(ResultRecord::Failure(detail.clone())),
            ItemState::Pending | ItemState::Processing | ItemState::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_terminal() {
        assert!(!ItemStatus::Pending.is_terminal());
        assert!(!ItemStatus::Processing.is_terminal());
        assert!(ItemStatus::Succeeded.is_terminal());
        assert!(ItemStatus::Failed.is_terminal());
        assert!(ItemStatus::Cancelled.is_terminal());
    }

    #[test]
    fn state_maps_to_status_and_record() {
        let state: ItemState<u32> = ItemState::Succeeded(7);
        assert_eq!(state.status(), ItemStatus::Succeeded);
        assert_eq!(state.record(), Some(ResultRecord::Success(7)));

        let state: ItemState<u32> = ItemState::Failed("invalid".to_owned());
        assert_eq!(state.status(), ItemStatus::Failed);
        assert_eq!(
            state.record(),
            Some(ResultRecord::Failure("invalid".to_owned()))
        );

        let state: ItemState<u32> = ItemState::Cancelled;
        assert_eq!(state.status(), ItemStatus::Cancelled);
        assert_eq!(state.record(), None);
    }

    #[test]
    fn work_item_preserves_raw_value() {
        let item = WorkItem::new("user:pass@proxy.example:8080");
        assert_eq!(item.as_str(), "user:pass@proxy.example:8080");
        assert_eq!(item.to_string(), "user:pass@proxy.example:8080");
        assert_eq!(item.into_string(), "user:pass@proxy.example:8080");
    }
}
