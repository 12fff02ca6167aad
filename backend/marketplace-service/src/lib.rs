pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

pub use config::Config;
pub use error::{AppError, Result};

use services::storage::ImageStore;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>, images: Arc<dyn ImageStore>) -> Self {
        Self { db, config, images }
    }
}
