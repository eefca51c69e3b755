use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::domain::notification::{MarkAllScope, Notification, NotificationFilter, PageRange};
use crate::infra::db::Db;
use crate::infra::store::NotificationStore;

const NOTIFICATION_COLUMNS: &str = "id, user_id, \"type\", data, is_read, created_at";

#[derive(Clone)]
pub struct PgNotificationStore {
    db: Db,
}

impl PgNotificationStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

/// Appends the filter as `AND`-joined equality predicates. The caller must have
/// already pushed a `WHERE TRUE`.
fn push_predicates(builder: &mut QueryBuilder<'_, Postgres>, filter: &NotificationFilter) {
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if filter.unread_only {
        builder.push(" AND is_read = FALSE");
    }
    if let Some(kind) = &filter.kind {
        builder.push(" AND \"type\" = ").push_bind(kind.clone());
    }
}

fn notification_from_row(row: &PgRow) -> Notification {
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: row.get("type"),
        data: Notification::payload_from(row.get::<Option<Value>, _>("data")),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn select(
        &self,
        filter: &NotificationFilter,
        range: PageRange,
    ) -> Result<Vec<Notification>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder
            .push(NOTIFICATION_COLUMNS)
            .push(" FROM notifications WHERE TRUE");
        push_predicates(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(range.limit)
            .push(" OFFSET ")
            .push_bind(range.offset);

        let rows = builder.build().fetch_all(self.db.pool()).await?;
        Ok(rows.iter().map(notification_from_row).collect())
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<i64> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notifications WHERE TRUE");
        push_predicates(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_optional(self.db.pool())
            .await?;
        Ok(count.unwrap_or(0))
    }

    async fn mark_read_and_fetch(&self, id: Uuid) -> Result<Option<Notification>> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.as_ref().map(notification_from_row))
    }

    async fn mark_all_read(&self, scope: MarkAllScope) -> Result<u64> {
        let result = match scope {
            MarkAllScope::User(user_id) => {
                sqlx::query(
                    "UPDATE notifications SET is_read = TRUE \
                     WHERE user_id = $1 AND is_read = FALSE",
                )
                .bind(user_id)
                .execute(self.db.pool())
                .await?
            }
            MarkAllScope::All => {
                sqlx::query("UPDATE notifications SET is_read = TRUE WHERE is_read = FALSE")
                    .execute(self.db.pool())
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}
