//! User favorites and the derived per-user catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A heart mark owned by the end-user UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFavorite {
    pub user_id: String,
    pub image_id: Option<i64>,
    pub original_url: String,
    pub is_heart_marked: bool,
}

/// Row of a user's derived catalog, rebuilt on every sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCatalogEntry {
    pub id: i64,
    pub user_id: String,
    /// Back-reference to `catalog_entries.id`
    pub global_image_id: i64,
    pub original_url: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub is_heart_marked: bool,
    pub synced_at: DateTime<Utc>,
}
