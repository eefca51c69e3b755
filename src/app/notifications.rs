use anyhow::Result;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::notification::{
    MarkAllScope, Notification, NotificationFilter, NotificationPage, PageRange,
};
use crate::infra::store::NotificationStore;

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// One page of matching notifications plus the unread total.
    ///
    /// The unread total follows `filter.user_id` only; `unread_only` and `kind`
    /// narrow the page but never the counter.
    pub async fn list(
        &self,
        filter: &NotificationFilter,
        range: PageRange,
    ) -> Result<NotificationPage> {
        let unread_filter = NotificationFilter::unread_for(filter.user_id);
        let (notifications, unread_count) = tokio::try_join!(
            self.store.select(filter, range),
            self.store.count(&unread_filter)
        )?;

        Ok(NotificationPage {
            notifications,
            unread_count,
        })
    }

    /// Returns the post-update row, or `None` if `id` does not exist.
    pub async fn mark_read(&self, id: Uuid) -> Result<Option<Notification>> {
        let notification = self.store.mark_read_and_fetch(id).await?;
        if notification.is_none() {
            tracing::debug!(notification_id = %id, "mark read matched no notification");
        }
        Ok(notification)
    }

    pub async fn mark_all_read(&self, scope: MarkAllScope) -> Result<u64> {
        if scope == MarkAllScope::All {
            tracing::warn!("marking notifications read for all users");
        }
        let updated = self.store.mark_all_read(scope).await?;
        tracing::info!(scope = ?scope, updated, "marked notifications read");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let deleted = self.store.delete(id).await?;
        if deleted == 0 {
            tracing::debug!(notification_id = %id, "delete matched no notification");
        }
        Ok(())
    }
}
