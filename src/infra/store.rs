use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::notification::{MarkAllScope, Notification, NotificationFilter, PageRange};

/// Persistence contract for notifications.
///
/// Every call is one independent unit of work against the backing store.
/// Nothing is cached between calls.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Rows matching `filter`, newest `created_at` first, windowed by `range`.
    async fn select(
        &self,
        filter: &NotificationFilter,
        range: PageRange,
    ) -> Result<Vec<Notification>>;

    async fn count(&self, filter: &NotificationFilter) -> Result<i64>;

    /// Sets `is_read` on one row, then reads the row back.
    ///
    /// Returns `None` when no row has this id. Backends run the write and the
    /// read in one transaction when they can; otherwise a concurrent writer may
    /// land between the two steps.
    async fn mark_read_and_fetch(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Returns the number of rows touched.
    async fn mark_all_read(&self, scope: MarkAllScope) -> Result<u64>;

    /// Returns the number of rows removed. Zero is not an error.
    async fn delete(&self, id: Uuid) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}
