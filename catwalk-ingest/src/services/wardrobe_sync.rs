//! Wardrobe Synchronizer
//!
//! Trims the shared catalog to one user's heart-marked subset and rebuilds
//! that user's derived catalog from it. The trim is global: there is one
//! shared catalog, and every entry the syncing user has not heart-marked is
//! deleted from it.
//!
//! Delete, clear and rebuild run in a single transaction. Any failure, or a
//! cancellation noticed before commit, rolls the whole sync back.

use catwalk_common::{time, Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db::{catalog, wardrobe};

pub const SYNC_HEART_MARKED_ONLY: &str = "heart_marked_only";
pub const DEFAULT_USER_ID: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub total_global_images: usize,
    pub heart_marked_images: usize,
    pub images_kept: usize,
    pub images_removed: usize,
    pub user_database_synced: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub user_id: String,
    pub stats: SyncStats,
    pub sync_timestamp: DateTime<Utc>,
}

pub fn validate_sync_type(sync_type: &str) -> Result<()> {
    if sync_type == SYNC_HEART_MARKED_ONLY {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid sync_type '{}'. Use \"{}\"",
            sync_type, SYNC_HEART_MARKED_ONLY
        )))
    }
}

pub async fn sync_wardrobe(
    pool: &SqlitePool,
    sync_type: &str,
    user_id: &str,
    cancel: &CancellationToken,
) -> Result<SyncReport> {
    validate_sync_type(sync_type)?;
    let sync_timestamp = time::now();

    let mut tx = pool.begin().await?;

    let entries = catalog::list_entries(&mut *tx).await?;
    let favorites = wardrobe::heart_marked_urls(&mut *tx, user_id).await?;
    let favorited: HashSet<&str> = favorites.iter().map(String::as_str).collect();

    let (kept, removed): (Vec<_>, Vec<_>) = entries
        .iter()
        .partition(|entry| favorited.contains(entry.original_url.as_str()));

    for entry in &removed {
        catalog::delete_entry(&mut *tx, entry.id).await?;
    }

    wardrobe::clear_user_catalog(&mut *tx, user_id).await?;
    for entry in &kept {
        wardrobe::insert_user_entry(&mut *tx, user_id, entry, sync_timestamp).await?;
    }

    if cancel.is_cancelled() {
        tx.rollback().await?;
        warn!(user_id = %user_id, "Wardrobe sync cancelled; rolled back");
        return Err(Error::Cancelled("wardrobe sync cancelled before commit".to_string()));
    }

    tx.commit().await?;

    let stats = SyncStats {
        total_global_images: entries.len(),
        heart_marked_images: favorites.len(),
        images_kept: kept.len(),
        images_removed: removed.len(),
        user_database_synced: kept.len(),
    };

    info!(
        user_id = %user_id,
        kept = stats.images_kept,
        removed = stats.images_removed,
        "Wardrobe sync committed"
    );

    Ok(SyncReport {
        user_id: user_id.to_string(),
        stats,
        sync_timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_heart_marked_sync_type_is_valid() {
        assert!(validate_sync_type(SYNC_HEART_MARKED_ONLY).is_ok());
        assert!(matches!(validate_sync_type("everything"), Err(Error::InvalidInput(_))));
    }
}
