//! Learning and rule endpoints
//!
//! POST /training/apply-learning, GET /training/patterns/latest,
//! POST /training/compile-rules, GET /training/rules

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::patterns;
use crate::error::{ApiError, ApiResult};
use crate::models::LearningPattern;
use crate::services::feedback_learner::{self, PatternSummary};
use crate::services::rule_compiler;
use crate::services::{ActiveRules, JobKind, LearningStats};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ApplyLearningResponse {
    pub success: bool,
    pub message: String,
    pub stats: LearningStats,
    pub patterns: PatternSummary,
    pub pattern_id: i64,
    pub cancelled: bool,
    pub failures: Vec<String>,
}

/// POST /training/apply-learning
pub async fn apply_learning(
    State(state): State<AppState>,
) -> ApiResult<Json<ApplyLearningResponse>> {
    let guard = state.batch_lock.try_acquire(JobKind::ApplyLearning)?;
    let report = feedback_learner::apply_learning(&state.db, guard.token()).await?;

    let message = if report.cancelled {
        "Learning cycle cancelled"
    } else {
        "Learning cycle completed"
    };

    Ok(Json(ApplyLearningResponse {
        success: true,
        message: message.to_string(),
        stats: report.stats,
        patterns: report.patterns,
        pattern_id: report.pattern_id,
        cancelled: report.cancelled,
        failures: report.failures,
    }))
}

#[derive(Debug, Serialize)]
pub struct LatestPatternResponse {
    pub success: bool,
    pub pattern: LearningPattern,
}

/// GET /training/patterns/latest
pub async fn latest_pattern(
    State(state): State<AppState>,
) -> ApiResult<Json<LatestPatternResponse>> {
    let pattern = patterns::latest_pattern(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("No learning cycle has run yet".to_string()))?;

    Ok(Json(LatestPatternResponse { success: true, pattern }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompileRulesRequest {
    #[serde(default)]
    pub include_positive_keywords: bool,
}

#[derive(Debug, Serialize)]
pub struct RulesResponse {
    pub success: bool,
    #[serde(flatten)]
    pub active: ActiveRules,
}

/// POST /training/compile-rules
pub async fn compile_rules(
    State(state): State<AppState>,
    body: Option<Json<CompileRulesRequest>>,
) -> ApiResult<Json<RulesResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let _guard = state.batch_lock.try_acquire(JobKind::CompileRules)?;
    let active = rule_compiler::compile_rules(
        &state.db,
        &state.config.filter,
        request.include_positive_keywords,
    )
    .await?;

    Ok(Json(RulesResponse { success: true, active }))
}

/// GET /training/rules
pub async fn active_rules(State(state): State<AppState>) -> ApiResult<Json<RulesResponse>> {
    let active = rule_compiler::load_active_rules(&state.db, &state.config.filter).await?;
    Ok(Json(RulesResponse { success: true, active }))
}

pub fn training_routes() -> Router<AppState> {
    Router::new()
        .route("/training/apply-learning", post(apply_learning))
        .route("/training/patterns/latest", get(latest_pattern))
        .route("/training/compile-rules", post(compile_rules))
        .route("/training/rules", get(active_rules))
}
