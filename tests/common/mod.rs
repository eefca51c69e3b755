#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

use beacon::domain::notification::{MarkAllScope, Notification, NotificationFilter, PageRange};
use beacon::infra::db::Db;
use beacon::infra::memory::MemoryNotificationStore;
use beacon::infra::postgres::PgNotificationStore;
use beacon::infra::store::NotificationStore;
use beacon::AppState;

// ---------------------------------------------------------------------------
// TestApp — one per test, each with its own in-memory store
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryNotificationStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"]["message"]
            .as_str()
            .unwrap_or("")
            .to_string()
    }

    pub fn error_code(&self) -> String {
        self.json()["error"]["code"]
            .as_str()
            .unwrap_or("")
            .to_string()
    }

    /// Ids of the listed notifications, in response order.
    pub fn ids(&self) -> Vec<Uuid> {
        self.json()["notifications"]
            .as_array()
            .expect("notifications array")
            .iter()
            .map(|item| Uuid::parse_str(item["id"].as_str().expect("id")).expect("uuid"))
            .collect()
    }
}

pub fn app() -> TestApp {
    TestApp::new()
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryNotificationStore::new());
        let router = beacon::http::router(AppState::new(store.clone()));
        TestApp { router, store }
    }

    /// Router over a store whose every call fails.
    pub fn failing() -> Router {
        beacon::http::router(AppState::new(Arc::new(FailingStore)))
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        send(&self.router, method, path, body).await
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Method::GET, path, None).await
    }

    pub async fn put_json(&self, path: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn put(&self, path: &str) -> TestResponse {
        self.request(Method::PUT, path, None).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request(Method::DELETE, path, None).await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Seed a notification created `minutes_ago` minutes before now.
    pub async fn seed(
        &self,
        user_id: Option<Uuid>,
        kind: &str,
        is_read: bool,
        minutes_ago: i64,
    ) -> Uuid {
        let notification = notification(user_id, kind, is_read, minutes_ago);
        let id = notification.id;
        self.store.insert(notification).await;
        id
    }
}

pub async fn send(router: &Router, method: Method, path: &str, body: Option<Value>) -> TestResponse {
    let builder = Request::builder()
        .method(method)
        .uri(path)
        .header("host", "localhost");

    let request = if let Some(body) = body {
        builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("oneshot failed");

    let status = response.status();
    let body_bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to collect body")
        .to_bytes();

    TestResponse { status, body_bytes }
}

pub fn notification(
    user_id: Option<Uuid>,
    kind: &str,
    is_read: bool,
    minutes_ago: i64,
) -> Notification {
    let mut data = Map::new();
    data.insert("source".into(), Value::String(format!("{}-source", kind)));
    Notification {
        id: Uuid::new_v4(),
        user_id,
        kind: kind.to_string(),
        data,
        is_read,
        created_at: OffsetDateTime::now_utc() - Duration::minutes(minutes_ago),
    }
}

// ---------------------------------------------------------------------------
// FailingStore — every call errors, for exercising error responses
// ---------------------------------------------------------------------------

pub struct FailingStore;

#[async_trait]
impl NotificationStore for FailingStore {
    async fn select(
        &self,
        _filter: &NotificationFilter,
        _range: PageRange,
    ) -> Result<Vec<Notification>> {
        Err(anyhow!("relation \"notifications\" does not exist"))
    }

    async fn count(&self, _filter: &NotificationFilter) -> Result<i64> {
        Err(anyhow!("relation \"notifications\" does not exist"))
    }

    async fn mark_read_and_fetch(&self, _id: Uuid) -> Result<Option<Notification>> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn mark_all_read(&self, _scope: MarkAllScope) -> Result<u64> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn delete(&self, _id: Uuid) -> Result<u64> {
        Err(anyhow!("permission denied for table notifications"))
    }

    async fn ping(&self) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
}

// ---------------------------------------------------------------------------
// PgHarness — opt-in, runs only when TEST_DATABASE_BASE_URL is set
// ---------------------------------------------------------------------------

static TEST_DATABASE_URL: OnceCell<Option<String>> = OnceCell::const_new();

pub struct PgHarness {
    pub pool: PgPool,
    pub store: Arc<PgNotificationStore>,
}

/// Connect to the migrated test database, or `None` when no Postgres is configured.
///
/// Database creation, migrations and truncation run once per test binary. Each
/// caller gets its own pool because every `#[tokio::test]` has its own runtime.
pub async fn postgres() -> Option<PgHarness> {
    let database_url = TEST_DATABASE_URL
        .get_or_init(|| async { prepare_database().await })
        .await
        .clone()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("cannot connect to test database");
    let store = Arc::new(PgNotificationStore::new(Db::from_pool(pool.clone())));

    Some(PgHarness { pool, store })
}

async fn prepare_database() -> Option<String> {
    let Ok(base_url) = std::env::var("TEST_DATABASE_BASE_URL") else {
        eprintln!("TEST_DATABASE_BASE_URL not set, skipping postgres tests");
        return None;
    };
    let test_db =
        std::env::var("TEST_DATABASE_NAME").unwrap_or_else(|_| "beacon_test".into());

    // ---- Create test database if needed ----
    let admin_pool = PgPool::connect(&format!("{}/postgres", base_url))
        .await
        .expect("cannot connect to postgres admin database");

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(&test_db)
            .fetch_one(&admin_pool)
            .await
            .expect("failed to check test db existence");

    if !exists {
        // CREATE DATABASE cannot run inside a transaction
        sqlx::query(&format!("CREATE DATABASE \"{}\"", test_db))
            .execute(&admin_pool)
            .await
            .expect("failed to create test database");
    }
    admin_pool.close().await;

    // ---- Run migrations ----
    let database_url = format!("{}/{}", base_url, test_db);
    let db_pool = PgPool::connect(&database_url)
        .await
        .expect("cannot connect to test database");

    let mut migration_files: Vec<_> = std::fs::read_dir("migrations")
        .expect("cannot read migrations/")
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "sql"))
        .collect();
    migration_files.sort_by_key(|e| e.file_name());

    for entry in &migration_files {
        let sql = std::fs::read_to_string(entry.path())
            .unwrap_or_else(|_| panic!("cannot read {:?}", entry.path()));
        sqlx::raw_sql(&sql)
            .execute(&db_pool)
            .await
            .unwrap_or_else(|e| panic!("migration {:?} failed: {}", entry.file_name(), e));
    }

    sqlx::query("TRUNCATE TABLE notifications")
        .execute(&db_pool)
        .await
        .expect("failed to truncate notifications");
    db_pool.close().await;

    Some(database_url)
}

impl PgHarness {
    pub fn router(&self) -> Router {
        beacon::http::router(AppState::new(self.store.clone()))
    }

    /// Insert a row directly, bypassing the store. `data: None` stores SQL NULL.
    pub async fn insert(
        &self,
        user_id: Option<Uuid>,
        kind: &str,
        data: Option<Value>,
        is_read: bool,
        minutes_ago: i64,
    ) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO notifications (user_id, \"type\", data, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(user_id)
        .bind(kind)
        .bind(data)
        .bind(is_read)
        .bind(OffsetDateTime::now_utc() - Duration::minutes(minutes_ago))
        .fetch_one(&self.pool)
        .await
        .expect("insert test notification failed")
    }

    pub async fn is_read(&self, id: Uuid) -> bool {
        sqlx::query_scalar("SELECT is_read FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .expect("notification row missing")
    }
}
