use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::notification::{MarkAllScope, Notification, NotificationFilter, PageRange};
use crate::infra::store::NotificationStore;

/// Process-local store for tests and `STORE_BACKEND=memory` runs.
#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: RwLock<Vec<Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a row. Stands in for the external producer; not reachable over HTTP.
    pub async fn insert(&self, notification: Notification) {
        self.rows.write().await.push(notification);
    }

    pub async fn get(&self, id: Uuid) -> Option<Notification> {
        self.rows.read().await.iter().find(|row| row.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn select(
        &self,
        filter: &NotificationFilter,
        range: PageRange,
    ) -> Result<Vec<Notification>> {
        let rows = self.rows.read().await;
        let mut matched: Vec<Notification> = rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = usize::try_from(range.offset).unwrap_or(0);
        let limit = usize::try_from(range.limit).unwrap_or(0);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<i64> {
        let rows = self.rows.read().await;
        let count = rows.iter().filter(|row| filter.matches(row)).count();
        Ok(i64::try_from(count)?)
    }

    async fn mark_read_and_fetch(&self, id: Uuid) -> Result<Option<Notification>> {
        let mut rows = self.rows.write().await;
        let row = rows.iter_mut().find(|row| row.id == id);
        Ok(row.map(|row| {
            row.is_read = true;
            row.clone()
        }))
    }

    async fn mark_all_read(&self, scope: MarkAllScope) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let mut touched = 0;
        for row in rows.iter_mut().filter(|row| !row.is_read) {
            let in_scope = match scope {
                MarkAllScope::All => true,
                MarkAllScope::User(user_id) => row.user_id == Some(user_id),
            };
            if in_scope {
                row.is_read = true;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn delete(&self, id: Uuid) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
