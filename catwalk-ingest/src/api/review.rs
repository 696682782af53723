//! Review endpoints
//!
//! GET /review-status, POST /training/setup-review, GET /training/queue,
//! POST /training/feedback

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::catalog;
use crate::error::{ApiError, ApiResult};
use crate::models::CatalogEntry;
use crate::services::feedback::{self, FeedbackInput};
use crate::services::review_manager;
use crate::services::ReviewStatusReport;
use crate::AppState;

/// Entries returned when no session is named
const DEFAULT_QUEUE_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewStatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: ReviewStatusReport,
}

/// GET /review-status?session_id=
///
/// Unknown session (or no active session when none is named) answers 404
/// with `review_completed: false`.
pub async fn review_status(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let session_id = query.session_id.as_deref().filter(|s| !s.is_empty());

    match review_manager::get_status(&state.db, session_id).await {
        Ok(report) => Json(ReviewStatusResponse { success: true, report }).into_response(),
        Err(catwalk_common::Error::NotFound(message)) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "review_completed": false,
                "error": { "code": "NOT_FOUND", "message": message },
            })),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SetupReviewRequest {
    pub review_type: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewSessionSummary {
    pub session_id: String,
    pub total_images: i64,
    pub review_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SetupReviewResponse {
    pub success: bool,
    pub review_session: ReviewSessionSummary,
    pub images_queued: usize,
}

/// POST /training/setup-review
pub async fn setup_review(
    State(state): State<AppState>,
    Json(request): Json<SetupReviewRequest>,
) -> ApiResult<Json<SetupReviewResponse>> {
    let setup =
        review_manager::setup_review(&state.db, &request.review_type, &state.config.review).await?;

    Ok(Json(SetupReviewResponse {
        success: true,
        review_session: ReviewSessionSummary {
            session_id: setup.session.session_id,
            total_images: setup.session.total_images,
            review_url: setup.review_url,
            expires_at: setup.session.expires_at,
        },
        images_queued: setup.images_queued,
    }))
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub success: bool,
    pub session_id: Option<String>,
    pub count: usize,
    pub images: Vec<CatalogEntry>,
}

/// GET /training/queue?session_id=
pub async fn review_queue(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<QueueResponse>> {
    let session_id = query.session_id.filter(|s| !s.is_empty());

    let images = match &session_id {
        Some(id) => catalog::list_by_session(&state.db, id).await?,
        None => catalog::list_unreviewed(&state.db, DEFAULT_QUEUE_LIMIT).await?,
    };

    Ok(Json(QueueResponse {
        success: true,
        session_id,
        count: images.len(),
        images,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub image_id: Option<i64>,
    pub approved: Option<bool>,
    #[serde(default)]
    pub duplicate: bool,
    #[serde(default, alias = "reason")]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub message: String,
    pub training_status: crate::models::TrainingStatus,
    pub updated_rules: Vec<String>,
}

/// POST /training/feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<Json<FeedbackResponse>> {
    let (Some(image_id), Some(approved)) = (request.image_id, request.approved) else {
        return Err(ApiError::BadRequest(
            "imageId and approved are required".to_string(),
        ));
    };

    let outcome = feedback::record_feedback(
        &state.db,
        FeedbackInput {
            image_id,
            approved,
            duplicate: request.duplicate,
            rejection_reason: request.rejection_reason,
            category: request.category,
            notes: request.notes,
        },
    )
    .await?;

    Ok(Json(FeedbackResponse {
        success: true,
        message: "Training feedback processed successfully".to_string(),
        training_status: outcome.training_status,
        updated_rules: outcome.updated_rules,
    }))
}

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/review-status", get(review_status))
        .route("/training/setup-review", post(setup_review))
        .route("/training/queue", get(review_queue))
        .route("/training/feedback", post(submit_feedback))
}
