//! Learning pattern snapshots

use catwalk_common::{time, Result};
use sqlx::{Row, SqlitePool};

use crate::models::LearningPattern;

/// Persist a snapshot and return its id
pub async fn save_pattern(pool: &SqlitePool, pattern: &LearningPattern) -> Result<i64> {
    let excluded_urls = serde_json::to_string(&pattern.excluded_urls)?;
    let preferred_categories = serde_json::to_string(&pattern.preferred_categories)?;
    let positive_keywords = serde_json::to_string(&pattern.positive_keywords)?;
    let url_patterns = serde_json::to_string(&pattern.url_patterns)?;

    let result = sqlx::query(
        r#"
        INSERT INTO learning_patterns (
            cycle_timestamp, approved_count, rejected_count, duplicate_count,
            excluded_urls, preferred_categories, positive_keywords, url_patterns
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(time::to_db(&pattern.cycle_timestamp))
    .bind(pattern.approved_count as i64)
    .bind(pattern.rejected_count as i64)
    .bind(pattern.duplicate_count as i64)
    .bind(excluded_urls)
    .bind(preferred_categories)
    .bind(positive_keywords)
    .bind(url_patterns)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Snapshot from the most recent learning cycle
pub async fn latest_pattern(pool: &SqlitePool) -> Result<Option<LearningPattern>> {
    let row = sqlx::query(
        r#"
        SELECT id, cycle_timestamp, approved_count, rejected_count, duplicate_count,
               excluded_urls, preferred_categories, positive_keywords, url_patterns
        FROM learning_patterns
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(LearningPattern {
        id: Some(row.get("id")),
        cycle_timestamp: time::from_db(&row.get::<String, _>("cycle_timestamp"))?,
        approved_count: row.get::<i64, _>("approved_count") as usize,
        rejected_count: row.get::<i64, _>("rejected_count") as usize,
        duplicate_count: row.get::<i64, _>("duplicate_count") as usize,
        excluded_urls: serde_json::from_str(&row.get::<String, _>("excluded_urls"))?,
        preferred_categories: serde_json::from_str(&row.get::<String, _>("preferred_categories"))?,
        positive_keywords: serde_json::from_str(&row.get::<String, _>("positive_keywords"))?,
        url_patterns: serde_json::from_str(&row.get::<String, _>("url_patterns"))?,
    }))
}
