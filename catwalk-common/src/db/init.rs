//! Database initialization
//!
//! Opens (or creates) the catalog database and ensures every table exists.
//! Schema creation is idempotent and runs on every startup.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

use crate::Result;

/// Open or create the database file and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets status polls read while a batch job writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema (tests, dry runs)
pub async fn init_memory_database() -> Result<SqlitePool> {
    // One connection: every pooled connection to :memory: is a separate database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create every table owned by the catalog pipeline
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_catalog_entries_table(pool).await?;
    create_review_sessions_table(pool).await?;
    create_review_verdicts_table(pool).await?;
    create_learning_patterns_table(pool).await?;
    create_learned_rules_table(pool).await?;
    create_filter_rules_table(pool).await?;
    create_user_favorites_table(pool).await?;
    create_user_catalog_entries_table(pool).await?;

    info!("Database schema ready");
    Ok(())
}

/// Shared catalog; `original_url` is the only dedup key
async fn create_catalog_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            original_url TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            page_url TEXT,
            width INTEGER NOT NULL DEFAULT 0,
            height INTEGER NOT NULL DEFAULT 0,
            training_status TEXT NOT NULL DEFAULT 'pending',
            training_feedback TEXT,
            training_notes TEXT,
            review_session_id TEXT,
            crawled_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            trained_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_catalog_review_session \
         ON catalog_entries(review_session_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_catalog_training_status \
         ON catalog_entries(training_status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_review_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_sessions (
            session_id TEXT PRIMARY KEY,
            review_type TEXT NOT NULL,
            total_images INTEGER NOT NULL DEFAULT 0,
            images_reviewed INTEGER NOT NULL DEFAULT 0,
            images_approved INTEGER NOT NULL DEFAULT 0,
            images_rejected INTEGER NOT NULL DEFAULT 0,
            images_duplicates INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Latest verdict per session member; outlives catalog row deletion
async fn create_review_verdicts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_verdicts (
            session_id TEXT NOT NULL,
            image_id INTEGER NOT NULL,
            verdict TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            PRIMARY KEY (session_id, image_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Write-once snapshots emitted by the feedback learner
async fn create_learning_patterns_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS learning_patterns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cycle_timestamp TEXT NOT NULL,
            approved_count INTEGER NOT NULL,
            rejected_count INTEGER NOT NULL,
            duplicate_count INTEGER NOT NULL,
            excluded_urls TEXT NOT NULL DEFAULT '[]',
            preferred_categories TEXT NOT NULL DEFAULT '{}',
            positive_keywords TEXT NOT NULL DEFAULT '[]',
            url_patterns TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Keyword rules derived from individual review feedback
async fn create_learned_rules_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS learned_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rule_type TEXT NOT NULL,
            keyword TEXT NOT NULL,
            reason TEXT,
            image_id INTEGER,
            created_at TEXT NOT NULL,
            UNIQUE(rule_type, keyword)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Versioned, compiled Image Filter rule sets
async fn create_filter_rules_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS filter_rules (
            version INTEGER PRIMARY KEY,
            rules TEXT NOT NULL,
            compiled_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Written by the end-user UI; read-only for the pipeline
async fn create_user_favorites_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_favorites (
            user_id TEXT NOT NULL,
            image_id INTEGER,
            original_url TEXT NOT NULL,
            is_heart_marked INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, original_url)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Derived per-user catalog, replaced wholesale on every sync
async fn create_user_catalog_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_catalog_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            global_image_id INTEGER NOT NULL,
            original_url TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            is_heart_marked INTEGER NOT NULL DEFAULT 1,
            synced_at TEXT NOT NULL,
            UNIQUE(user_id, original_url)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
