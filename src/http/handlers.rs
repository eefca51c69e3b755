use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::notifications::NotificationService;
use crate::domain::notification::{
    MarkAllScope, Notification, NotificationFilter, NotificationPage, PageRange,
    DEFAULT_PAGE_LIMIT, DEFAULT_PAGE_OFFSET,
};
use crate::http::error::{DELETE_ERROR, LIST_ERROR, UPDATE_ERROR};
use crate::http::AppError;
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub notification: Option<Notification>,
}

/// Query string of `GET /notifications`. Empty values count as absent, so a
/// filter form with nothing selected lists everything.
#[derive(Deserialize)]
pub struct ListNotificationsQuery {
    pub user_id: Option<String>,
    pub unread_only: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListNotificationsQuery {
    fn filter(&self) -> Result<NotificationFilter, AppError> {
        let user_id = match non_empty(self.user_id.as_deref()) {
            Some(raw) => Some(
                Uuid::parse_str(raw)
                    .map_err(|err| AppError::bad_request(format!("invalid user_id: {}", err)))?,
            ),
            None => None,
        };

        Ok(NotificationFilter {
            user_id,
            unread_only: self.unread_only.as_deref() == Some("true"),
            kind: non_empty(self.kind.as_deref()).map(str::to_string),
        })
    }

    fn range(&self) -> PageRange {
        PageRange {
            limit: coerce_int(self.limit.as_deref(), DEFAULT_PAGE_LIMIT),
            offset: coerce_int(self.offset.as_deref(), DEFAULT_PAGE_OFFSET),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Reads an optional sign and the leading digits, ignoring whatever follows
/// (`"10abc"` is 10). No digits at all yields `default`.
fn coerce_int(value: Option<&str>, default: i64) -> i64 {
    let Some(value) = value.map(str::trim_start) else {
        return default;
    };
    let (negative, unsigned) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .map_or(unsigned, |end| &unsigned[..end]);

    match digits.parse::<i64>() {
        Ok(parsed) if negative => -parsed,
        Ok(parsed) => parsed,
        Err(_) => default,
    }
}

#[derive(Deserialize, Default)]
pub struct MarkAllReadRequest {
    pub user_id: Option<Uuid>,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.store.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

pub async fn list_notifications(
    State(state): State<AppState>,
    query: Result<Query<ListNotificationsQuery>, QueryRejection>,
) -> Result<Json<NotificationPage>, AppError> {
    let Query(query) = query?;
    let filter = query.filter()?;

    let service = NotificationService::new(state.store.clone());
    let page = service
        .list(&filter, query.range())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = ?filter.user_id, "failed to list notifications");
            AppError::internal(LIST_ERROR, "Failed to fetch notifications")
        })?;

    Ok(Json(page))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<NotificationResponse>, AppError> {
    let Path(id) = id?;

    let service = NotificationService::new(state.store.clone());
    let notification = service.mark_read(id).await.map_err(|err| {
        tracing::error!(error = ?err, notification_id = %id, "failed to mark notification read");
        AppError::internal(UPDATE_ERROR, "Failed to update notification")
    })?;

    Ok(Json(NotificationResponse { notification }))
}

/// An empty body means every user's notifications. A body that is present but
/// malformed is rejected rather than widening to that scope.
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        MarkAllReadRequest::default()
    } else {
        serde_json::from_slice::<MarkAllReadRequest>(&body)
            .map_err(|err| AppError::bad_request(format!("invalid request body: {}", err)))?
    };
    let scope = MarkAllScope::from(request.user_id);

    let service = NotificationService::new(state.store.clone());
    service.mark_all_read(scope).await.map_err(|err| {
        tracing::error!(error = ?err, scope = ?scope, "failed to mark notifications read");
        AppError::internal(UPDATE_ERROR, "Failed to update notifications")
    })?;

    Ok(Json(MessageResponse {
        message: "All notifications marked as read",
    }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = id?;

    let service = NotificationService::new(state.store.clone());
    service.delete(id).await.map_err(|err| {
        tracing::error!(error = ?err, notification_id = %id, "failed to delete notification");
        AppError::internal(DELETE_ERROR, "Failed to delete notification")
    })?;

    Ok(Json(MessageResponse {
        message: "Notification deleted",
    }))
}
