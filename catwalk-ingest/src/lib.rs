//! catwalk-ingest library interface
//!
//! Fashion image pipeline: crawl a publication section, filter candidates,
//! catalog the survivors, track human review, learn from feedback, and sync a
//! user's wardrobe. Exposed as a library so integration tests can drive the
//! router directly.

pub mod api;
pub mod db;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::http::Method;
use axum::Router;
use catwalk_common::config::TomlConfig;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::extractor::PageRenderer;
use crate::services::BatchLock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<TomlConfig>,
    /// Backend used by crawl runs to render pages
    pub renderer: Arc<dyn PageRenderer>,
    /// Single-writer token for catalog-mutating batch jobs
    pub batch_lock: BatchLock,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: TomlConfig, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            renderer,
            batch_lock: BatchLock::new(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .merge(api::crawl_routes())
        .merge(api::review_routes())
        .merge(api::training_routes())
        .merge(api::wardrobe_routes())
        .merge(api::job_routes())
        .merge(api::health_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
