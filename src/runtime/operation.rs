use crate::batch::item::WorkItem;
use anyhow::Error as AnyError;
use core::future::Future;
use core::pin::Pin;
use std::fmt;

pub type OperationFuture<T> =
    Pin<Box<dyn Future<Output = Result<T, OperationError>> + Send + 'static>>;

/// Failure of the injected remote operation for a single item.
///
/// Carries a short human-readable detail suitable for the item's result
/// record. Per-item failures are data, never control flow: workers capture
/// them and move on to the next claim.
#[derive(Debug)]
pub struct OperationError {
    detail: String,
    source: Option<AnyError>,
}

impl OperationError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            source: None,
        }
    }

    pub fn with_source(detail: impl Into<String>, source: AnyError) -> Self {
        Self {
            detail: detail.into(),
            source: Some(source),
        }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn into_detail(self) -> String {
        self.detail
    }
}

impl From<AnyError> for OperationError {
    fn from(source: AnyError) -> Self {
        Self {
            detail: source.to_string(),
            source: Some(source),
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref()),
            None => None,
        }
    }
}

/// Trait implemented by the injected remote operations a batch run applies to
/// each item (credential add, account status refresh, ...).
///
/// The operation owns its I/O, timeouts, retries, and error normalization;
/// the engine invokes it exactly once per claimed item and records whatever
/// it returns.
pub trait BatchOperation: Send + Sync + 'static {
    type Payload: Clone + Send + 'static;

    /// Always async so implementations can perform network I/O.
    fn apply(&self, item: WorkItem) -> OperationFuture<Self::Payload>;
}

/// Adapter turning an async closure into a [`BatchOperation`], for callers
/// that do not want a dedicated operation type.
pub struct FnOperation<F> {
    func: F,
}

impl<F> FnOperation<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut, T> BatchOperation for FnOperation<F>
where
    F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, OperationError>> + Send + 'static,
    T: Clone + Send + 'static,
{
    type Payload = T;

    fn apply(&self, item: WorkItem) -> OperationFuture<T> {
        Box::pin((self.func)(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn display_shows_the_detail_only() {
        let error = OperationError::new("credential rejected");
        assert_eq!(format!("{error}"), "credential rejected");
        assert!(std::error::Error::source(&error).is_none());
    }

    #[test]
    fn conversion_from_anyhow_keeps_source_chain() {
        let error = OperationError::from(anyhow!("connection reset"));
        assert_eq!(error.detail(), "connection reset");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[tokio::test]
    async fn fn_operation_invokes_the_closure() {
        let operation = FnOperation::new(|item: WorkItem| async move {
            Ok::<_, OperationError>(item.as_str().len())
        });

        let length = operation
            .apply(WorkItem::new("abcd"))
            .await
            .expect("operation should succeed");
        assert_eq!(length, 4);
    }
}
