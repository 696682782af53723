//! Batch job control

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::services::{JobKind, RunningJobInfo};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobKind>,
}

/// POST /jobs/cancel
///
/// Signals the running job; it stops at its next checkpoint and releases the
/// lock when it returns.
pub async fn cancel_job(State(state): State<AppState>) -> Json<CancelResponse> {
    let job = state.batch_lock.cancel_current();
    Json(CancelResponse {
        cancelled: job.is_some(),
        job,
    })
}

#[derive(Debug, Serialize)]
pub struct CurrentJobResponse {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<RunningJobInfo>,
}

/// GET /jobs/current
pub async fn current_job(State(state): State<AppState>) -> Json<CurrentJobResponse> {
    let job = state.batch_lock.current();
    Json(CurrentJobResponse {
        running: job.is_some(),
        job,
    })
}

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/cancel", post(cancel_job))
        .route("/jobs/current", get(current_job))
}
