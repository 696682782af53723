//! Review session database operations

use catwalk_common::{time, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteExecutor, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::models::{ReviewSession, ReviewTally, TrainingStatus};

const SESSION_COLUMNS: &str = r#"
    session_id, review_type, total_images, images_reviewed, images_approved,
    images_rejected, images_duplicates, status, created_at, expires_at, completed_at
"#;

/// Insert or update a review session
pub async fn save_session<'e, E>(executor: E, session: &ReviewSession) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO review_sessions (
            session_id, review_type, total_images, images_reviewed, images_approved,
            images_rejected, images_duplicates, status, created_at, expires_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            images_reviewed = excluded.images_reviewed,
            images_approved = excluded.images_approved,
            images_rejected = excluded.images_rejected,
            images_duplicates = excluded.images_duplicates,
            status = excluded.status,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(&session.session_id)
    .bind(&session.review_type)
    .bind(session.total_images)
    .bind(session.images_reviewed)
    .bind(session.images_approved)
    .bind(session.images_rejected)
    .bind(session.images_duplicates)
    .bind(session.status.as_str())
    .bind(time::to_db(&session.created_at))
    .bind(time::to_db(&session.expires_at))
    .bind(session.completed_at.as_ref().map(time::to_db))
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn load_session(pool: &SqlitePool, session_id: &str) -> Result<Option<ReviewSession>> {
    let sql = format!("SELECT {} FROM review_sessions WHERE session_id = ?", SESSION_COLUMNS);
    let row = sqlx::query(&sql).bind(session_id).fetch_optional(pool).await?;
    row.as_ref().map(row_to_session).transpose()
}

/// Most recently created session still marked active (possibly past expiry)
pub async fn latest_active_session(pool: &SqlitePool) -> Result<Option<ReviewSession>> {
    let sql = format!(
        "SELECT {} FROM review_sessions WHERE status = 'active' ORDER BY created_at DESC LIMIT 1",
        SESSION_COLUMNS
    );
    let row = sqlx::query(&sql).fetch_optional(pool).await?;
    row.as_ref().map(row_to_session).transpose()
}

/// Record (or replace) the verdict for one session member
pub async fn record_verdict<'e, E: SqliteExecutor<'e>>(
    executor: E,
    session_id: &str,
    image_id: i64,
    verdict: TrainingStatus,
    recorded_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO review_verdicts (session_id, image_id, verdict, recorded_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(session_id, image_id) DO UPDATE SET
            verdict = excluded.verdict,
            recorded_at = excluded.recorded_at
        "#,
    )
    .bind(session_id)
    .bind(image_id)
    .bind(verdict.as_str())
    .bind(time::to_db(&recorded_at))
    .execute(executor)
    .await?;

    Ok(())
}

/// Verdict counts for a session.
///
/// Read from `review_verdicts`, so learning cycles that delete or curate the
/// reviewed catalog rows leave the counts unchanged.
pub async fn tally_session(pool: &SqlitePool, session_id: &str) -> Result<ReviewTally> {
    let row = sqlx::query(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN verdict = 'approved' THEN 1 ELSE 0 END), 0) AS approved,
            COALESCE(SUM(CASE WHEN verdict = 'rejected' THEN 1 ELSE 0 END), 0) AS rejected,
            COALESCE(SUM(CASE WHEN verdict = 'duplicate' THEN 1 ELSE 0 END), 0) AS duplicates
        FROM review_verdicts
        WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;

    Ok(ReviewTally {
        approved: row.get("approved"),
        rejected: row.get("rejected"),
        duplicates: row.get("duplicates"),
    })
}

fn row_to_session(row: &SqliteRow) -> Result<ReviewSession> {
    let status: String = row.get("status");

    Ok(ReviewSession {
        session_id: row.get("session_id"),
        review_type: row.get("review_type"),
        total_images: row.get("total_images"),
        images_reviewed: row.get("images_reviewed"),
        images_approved: row.get("images_approved"),
        images_rejected: row.get("images_rejected"),
        images_duplicates: row.get("images_duplicates"),
        status: status.parse()?,
        created_at: time::from_db(&row.get::<String, _>("created_at"))?,
        expires_at: time::from_db(&row.get::<String, _>("expires_at"))?,
        completed_at: time::from_db_opt(row.get("completed_at"))?,
    })
}
