//! User favorites and the derived per-user catalog

use catwalk_common::{time, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteExecutor;
use sqlx::{Row, SqlitePool};

use crate::models::{CatalogEntry, UserCatalogEntry, UserFavorite};

/// Insert or update a favorite (normally written by the end-user UI)
pub async fn save_favorite(
    pool: &SqlitePool,
    favorite: &UserFavorite,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_favorites (user_id, image_id, original_url, is_heart_marked, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id, original_url) DO UPDATE SET
            image_id = excluded.image_id,
            is_heart_marked = excluded.is_heart_marked
        "#,
    )
    .bind(&favorite.user_id)
    .bind(favorite.image_id)
    .bind(&favorite.original_url)
    .bind(favorite.is_heart_marked)
    .bind(time::to_db(&now))
    .execute(pool)
    .await?;

    Ok(())
}

/// Urls the user currently has heart-marked
pub async fn heart_marked_urls<'e, E>(executor: E, user_id: &str) -> Result<Vec<String>>
where
    E: SqliteExecutor<'e>,
{
    let urls = sqlx::query_scalar(
        "SELECT original_url FROM user_favorites \
         WHERE user_id = ? AND is_heart_marked = 1 ORDER BY original_url",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;
    Ok(urls)
}

/// Remove every derived row for a user; returns rows removed
pub async fn clear_user_catalog<'e, E>(executor: E, user_id: &str) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM user_catalog_entries WHERE user_id = ?")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Copy one shared catalog entry into the user's derived catalog
pub async fn insert_user_entry<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: &str,
    entry: &CatalogEntry,
    synced_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_catalog_entries (
            user_id, global_image_id, original_url, title, description,
            category, is_heart_marked, synced_at
        ) VALUES (?, ?, ?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(user_id)
    .bind(entry.id)
    .bind(&entry.original_url)
    .bind(&entry.title)
    .bind(&entry.description)
    .bind(&entry.category)
    .bind(time::to_db(&synced_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// A user's derived catalog ordered by url
pub async fn list_user_catalog(pool: &SqlitePool, user_id: &str) -> Result<Vec<UserCatalogEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, global_image_id, original_url, title, description,
               category, is_heart_marked, synced_at
        FROM user_catalog_entries
        WHERE user_id = ?
        ORDER BY original_url
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(UserCatalogEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                global_image_id: row.get("global_image_id"),
                original_url: row.get("original_url"),
                title: row.get("title"),
                description: row.get("description"),
                category: row.get("category"),
                is_heart_marked: row.get("is_heart_marked"),
                synced_at: time::from_db(&row.get::<String, _>("synced_at"))?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use catwalk_common::db::init_memory_database;

    #[tokio::test]
    async fn test_heart_marked_urls_filter_by_user_and_mark() {
        let pool = init_memory_database().await.unwrap();
        let now = time::now();

        let favorite = |user: &str, url: &str, marked: bool| UserFavorite {
            user_id: user.to_string(),
            image_id: None,
            original_url: url.to_string(),
            is_heart_marked: marked,
        };

        for (user, url, marked) in [
            ("ana", "https://cdn.example.com/a.jpg", true),
            ("ana", "https://cdn.example.com/b.jpg", false),
            ("ben", "https://cdn.example.com/c.jpg", true),
        ] {
            save_favorite(&pool, &favorite(user, url, marked), now).await.unwrap();
        }

        let urls = heart_marked_urls(&pool, "ana").await.unwrap();
        assert_eq!(urls, vec!["https://cdn.example.com/a.jpg".to_string()]);

        // Un-marking replaces the earlier mark
        let unmarked = favorite("ana", "https://cdn.example.com/a.jpg", false);
        save_favorite(&pool, &unmarked, now).await.unwrap();
        assert!(heart_marked_urls(&pool, "ana").await.unwrap().is_empty());
    }
}
