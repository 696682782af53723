//! Wardrobe endpoints
//!
//! POST /user/favorites, GET /user/catalog, POST /user/sync

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use catwalk_common::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{catalog, wardrobe};
use crate::error::{ApiError, ApiResult};
use crate::models::{UserCatalogEntry, UserFavorite};
use crate::services::wardrobe_sync::{self, DEFAULT_USER_ID};
use crate::services::{JobKind, SyncStats};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub sync_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    pub stats: SyncStats,
    pub sync_timestamp: DateTime<Utc>,
}

/// Trim the shared catalog to the user's heart-marked set and rebuild their
/// derived catalog.
pub async fn sync_user(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> ApiResult<Json<SyncResponse>> {
    // Reject a bad sync_type before touching the lock
    wardrobe_sync::validate_sync_type(&request.sync_type)?;

    let user_id = user_or_default(request.user_id);

    let guard = state.batch_lock.try_acquire(JobKind::WardrobeSync)?;
    let report =
        wardrobe_sync::sync_wardrobe(&state.db, &request.sync_type, &user_id, guard.token())
            .await?;

    Ok(Json(SyncResponse {
        success: true,
        message: "User database sync completed".to_string(),
        user_id: report.user_id,
        stats: report.stats,
        sync_timestamp: report.sync_timestamp,
    }))
}

fn user_or_default(user_id: Option<String>) -> String {
    user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    pub original_url: String,
    #[serde(default = "default_heart")]
    pub is_heart_marked: bool,
}

fn default_heart() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub success: bool,
    pub favorite: UserFavorite,
}

/// Set or clear a heart mark; the catalog id is filled in when the url is known
pub async fn mark_favorite(
    State(state): State<AppState>,
    Json(request): Json<FavoriteRequest>,
) -> ApiResult<Json<FavoriteResponse>> {
    let original_url = request.original_url.trim().to_string();
    if original_url.is_empty() {
        return Err(ApiError::BadRequest("original_url is required".to_string()));
    }

    let image_id = catalog::get_entry_by_url(&state.db, &original_url)
        .await?
        .map(|entry| entry.id);

    let favorite = UserFavorite {
        user_id: user_or_default(request.user_id),
        image_id,
        original_url,
        is_heart_marked: request.is_heart_marked,
    };
    wardrobe::save_favorite(&state.db, &favorite, time::now()).await?;

    Ok(Json(FavoriteResponse { success: true, favorite }))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserCatalogResponse {
    pub success: bool,
    pub user_id: String,
    pub count: usize,
    pub images: Vec<UserCatalogEntry>,
}

/// The user's derived catalog as of their last sync
pub async fn user_catalog(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<UserCatalogResponse>> {
    let user_id = user_or_default(query.user_id);
    let images = wardrobe::list_user_catalog(&state.db, &user_id).await?;

    Ok(Json(UserCatalogResponse {
        success: true,
        user_id,
        count: images.len(),
        images,
    }))
}

pub fn wardrobe_routes() -> Router<AppState> {
    Router::new()
        .route("/user/favorites", post(mark_favorite))
        .route("/user/catalog", get(user_catalog))
        .route("/user/sync", post(sync_user))
}
