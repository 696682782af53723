//! Catalog entry database operations
//!
//! Functions that may run inside a transaction take any [`SqliteExecutor`],
//! so callers pass either `&SqlitePool` or `&mut *tx`.

use catwalk_common::{time, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteExecutor, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::models::{CatalogEntry, NewCatalogEntry, TrainingStatus};

const ENTRY_COLUMNS: &str = r#"
    id, original_url, title, description, category, page_url, width, height,
    training_status, training_feedback, training_notes, review_session_id,
    crawled_at, created_at, trained_at
"#;

/// Insert a new entry unless its url is already catalogued.
///
/// Returns the new row id, or `None` when the url was a duplicate.
pub async fn insert_entry(
    pool: &SqlitePool,
    entry: &NewCatalogEntry,
    crawled_at: DateTime<Utc>,
) -> Result<Option<i64>> {
    let stamp = time::to_db(&crawled_at);

    let result = sqlx::query(
        r#"
        INSERT INTO catalog_entries (
            original_url, title, description, category, page_url,
            width, height, training_status, crawled_at, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
        ON CONFLICT(original_url) DO NOTHING
        "#,
    )
    .bind(&entry.original_url)
    .bind(&entry.title)
    .bind(&entry.description)
    .bind(&entry.category)
    .bind(&entry.page_url)
    .bind(entry.width as i64)
    .bind(entry.height as i64)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        Ok(None)
    } else {
        Ok(Some(result.last_insert_rowid()))
    }
}

pub async fn get_entry<'e, E>(executor: E, id: i64) -> Result<Option<CatalogEntry>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {} FROM catalog_entries WHERE id = ?", ENTRY_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
    row.as_ref().map(row_to_entry).transpose()
}

pub async fn get_entry_by_url(pool: &SqlitePool, url: &str) -> Result<Option<CatalogEntry>> {
    let sql = format!("SELECT {} FROM catalog_entries WHERE original_url = ?", ENTRY_COLUMNS);
    let row = sqlx::query(&sql).bind(url).fetch_optional(pool).await?;
    row.as_ref().map(row_to_entry).transpose()
}

/// Every catalog entry, oldest first
pub async fn list_entries<'e, E: SqliteExecutor<'e>>(executor: E) -> Result<Vec<CatalogEntry>> {
    let sql = format!("SELECT {} FROM catalog_entries ORDER BY id", ENTRY_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(executor).await?;
    rows.iter().map(row_to_entry).collect()
}

/// Entries tagged with a review session, oldest first
pub async fn list_by_session(pool: &SqlitePool, session_id: &str) -> Result<Vec<CatalogEntry>> {
    let sql = format!(
        "SELECT {} FROM catalog_entries WHERE review_session_id = ? ORDER BY id",
        ENTRY_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(session_id).fetch_all(pool).await?;
    rows.iter().map(row_to_entry).collect()
}

/// Newest entries still waiting for a verdict
pub async fn list_unreviewed(pool: &SqlitePool, limit: i64) -> Result<Vec<CatalogEntry>> {
    let sql = format!(
        "SELECT {} FROM catalog_entries
         WHERE training_status IN ('pending', 'queued')
         ORDER BY created_at DESC, id DESC
         LIMIT ?",
        ENTRY_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;
    rows.iter().map(row_to_entry).collect()
}

/// Ids of the newest pending entries
pub async fn select_pending_ids<'e, E>(executor: E, limit: i64) -> Result<Vec<i64>>
where
    E: SqliteExecutor<'e>,
{
    let ids = sqlx::query_scalar(
        r#"
        SELECT id FROM catalog_entries
        WHERE training_status = 'pending'
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(ids)
}

/// Mark a pending entry as queued for a review session
pub async fn tag_for_review<'e, E>(executor: E, id: i64, session_id: &str) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "UPDATE catalog_entries SET training_status = 'queued', review_session_id = ? WHERE id = ?",
    )
    .bind(session_id)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Verdict fields written by review feedback
#[derive(Debug, Clone)]
pub struct FeedbackUpdate {
    pub status: TrainingStatus,
    pub feedback: String,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub trained_at: DateTime<Utc>,
}

/// Store a review verdict. Returns false when the entry does not exist.
pub async fn record_feedback<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: i64,
    update: &FeedbackUpdate,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE catalog_entries SET
            training_status = ?,
            training_feedback = ?,
            training_notes = ?,
            category = COALESCE(?, category),
            trained_at = ?
        WHERE id = ?
        "#,
    )
    .bind(update.status.as_str())
    .bind(&update.feedback)
    .bind(&update.notes)
    .bind(&update.category)
    .bind(time::to_db(&update.trained_at))
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_status<'e, E>(executor: E, id: i64, status: TrainingStatus) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE catalog_entries SET training_status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Returns the number of rows removed (0 or 1)
pub async fn delete_entry<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM catalog_entries WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Delete an entry only while it is still rejected or duplicate.
///
/// Returns 0 when the row is gone or its verdict changed since it was read.
pub async fn delete_excluded_entry<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM catalog_entries WHERE id = ? AND training_status IN ('rejected', 'duplicate')",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Move an approved entry to `curated`; false if it is no longer approved
pub async fn curate_entry<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE catalog_entries SET training_status = 'curated' \
         WHERE id = ? AND training_status = 'approved'",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_entries<'e, E: SqliteExecutor<'e>>(executor: E) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
        .fetch_one(executor)
        .await?;
    Ok(count)
}

fn row_to_entry(row: &SqliteRow) -> Result<CatalogEntry> {
    let status: String = row.get("training_status");

    Ok(CatalogEntry {
        id: row.get("id"),
        original_url: row.get("original_url"),
        title: row.get("title"),
        description: row.get("description"),
        category: row.get("category"),
        page_url: row.get("page_url"),
        width: row.get::<i64, _>("width").max(0) as u32,
        height: row.get::<i64, _>("height").max(0) as u32,
        training_status: status.parse()?,
        training_feedback: row.get("training_feedback"),
        training_notes: row.get("training_notes"),
        review_session_id: row.get("review_session_id"),
        crawled_at: time::from_db(&row.get::<String, _>("crawled_at"))?,
        created_at: time::from_db(&row.get::<String, _>("created_at"))?,
        trained_at: time::from_db_opt(row.get("trained_at"))?,
    })
}
