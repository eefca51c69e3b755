pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::infra::store::NotificationStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }
}
