use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const DEFAULT_PAGE_OFFSET: i64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// `None` for broadcast/system notifications.
    pub user_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, Value>,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Notification {
    /// Normalizes a stored payload column into the mapping exposed to callers.
    /// Missing and `null` payloads become `{}`.
    pub fn payload_from(value: Option<Value>) -> Map<String, Value> {
        match value {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                tracing::warn!(payload = %other, "notification payload is not an object, dropping");
                Map::new()
            }
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Equality predicates applied as a conjunction. Unset fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub user_id: Option<Uuid>,
    pub unread_only: bool,
    pub kind: Option<String>,
}

impl NotificationFilter {
    /// Filter backing the unread counter: scoped by user only, never by type.
    pub fn unread_for(user_id: Option<Uuid>) -> Self {
        Self {
            user_id,
            unread_only: true,
            kind: None,
        }
    }

    pub fn matches(&self, notification: &Notification) -> bool {
        if let Some(user_id) = self.user_id {
            if notification.user_id != Some(user_id) {
                return false;
            }
        }
        if self.unread_only && notification.is_read {
            return false;
        }
        if let Some(kind) = &self.kind {
            if &notification.kind != kind {
                return false;
            }
        }
        true
    }
}

/// Row window `[offset, offset + limit - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub limit: i64,
    pub offset: i64,
}

impl Default for PageRange {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: DEFAULT_PAGE_OFFSET,
        }
    }
}

/// Target of a bulk "mark read". `All` touches every user's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkAllScope {
    All,
    User(Uuid),
}

impl From<Option<Uuid>> for MarkAllScope {
    fn from(user_id: Option<Uuid>) -> Self {
        match user_id {
            Some(user_id) => MarkAllScope::User(user_id),
            None => MarkAllScope::All,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}
