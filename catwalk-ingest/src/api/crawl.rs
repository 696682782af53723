//! POST /crawl

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::rule_compiler::load_active_rules;
use crate::services::{CrawlController, CrawlSummary, JobKind};
use crate::AppState;

/// Optional overrides of the configured crawl
#[derive(Debug, Default, Deserialize)]
pub struct CrawlRequest {
    #[serde(default)]
    pub seeds: Option<Vec<String>>,
    #[serde(default)]
    pub max_pages: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CrawlResponse {
    pub success: bool,
    pub message: String,
    pub results: CrawlSummary,
}

/// Run a crawl to completion and return its summary.
///
/// Holds the batch lock for the whole run; 409 if another job holds it.
pub async fn start_crawl(
    State(state): State<AppState>,
    body: Option<Json<CrawlRequest>>,
) -> ApiResult<Json<CrawlResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let mut config = state.config.crawl.clone();
    if let Some(seeds) = request.seeds {
        if seeds.is_empty() {
            return Err(ApiError::BadRequest("seeds must not be empty".to_string()));
        }
        config.seeds = seeds;
    }
    if let Some(max_pages) = request.max_pages {
        if max_pages == 0 {
            return Err(ApiError::BadRequest("max_pages must be at least 1".to_string()));
        }
        config.max_pages = max_pages;
    }

    let guard = state.batch_lock.try_acquire(JobKind::Crawl)?;

    let active = load_active_rules(&state.db, &state.config.filter).await?;
    let controller = CrawlController::new(state.db.clone(), state.renderer.clone(), config);
    let summary = controller.run(&active.rules, guard.token()).await?;

    Ok(Json(CrawlResponse {
        success: true,
        message: "Crawl completed".to_string(),
        results: summary,
    }))
}

pub fn crawl_routes() -> Router<AppState> {
    Router::new().route("/crawl", post(start_crawl))
}
