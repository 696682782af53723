//! Review Session Manager
//!
//! Tracks human-review progress over a batch of catalog entries. Expiry is
//! pull-based: a status read is what moves an overdue session to `expired`,
//! so a session nobody polls stays `active` in storage past its deadline.

use catwalk_common::config::ReviewConfig;
use catwalk_common::{time, Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{catalog, sessions};
use crate::models::{ReviewSession, ReviewStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ReviewProgress {
    pub total_images: i64,
    pub images_reviewed: i64,
    pub images_approved: i64,
    pub images_rejected: i64,
    pub images_duplicates: i64,
    pub completion_percentage: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub review_type: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ReviewStatus,
}

/// Status report returned to review pollers
#[derive(Debug, Clone, Serialize)]
pub struct ReviewStatusReport {
    pub review_completed: bool,
    pub session_expired: bool,
    pub session_id: String,
    pub review_progress: ReviewProgress,
    pub session_info: SessionInfo,
}

impl From<&ReviewSession> for ReviewStatusReport {
    fn from(session: &ReviewSession) -> Self {
        Self {
            review_completed: session.status == ReviewStatus::Completed,
            session_expired: session.status == ReviewStatus::Expired,
            session_id: session.session_id.clone(),
            review_progress: ReviewProgress {
                total_images: session.total_images,
                images_reviewed: session.images_reviewed,
                images_approved: session.images_approved,
                images_rejected: session.images_rejected,
                images_duplicates: session.images_duplicates,
                completion_percentage: session.completion_percentage(),
            },
            session_info: SessionInfo {
                review_type: session.review_type.clone(),
                created_at: session.created_at,
                expires_at: session.expires_at,
                completed_at: session.completed_at,
                status: session.status,
            },
        }
    }
}

/// Result of queuing a review batch
#[derive(Debug, Clone, Serialize)]
pub struct ReviewSetup {
    pub session: ReviewSession,
    pub images_queued: usize,
    pub review_url: String,
}

/// Create and persist a new active session
pub async fn create_session(
    pool: &SqlitePool,
    review_type: &str,
    total_images: i64,
    ttl: Duration,
) -> Result<ReviewSession> {
    if total_images < 0 {
        return Err(Error::InvalidInput("total_images must not be negative".to_string()));
    }

    let session = ReviewSession::new(review_type, total_images, ttl, time::now());
    sessions::save_session(pool, &session).await?;

    info!(session_id = %session.session_id, total_images, "Review session created");
    Ok(session)
}

/// Queue the newest pending entries into a fresh session, atomically
pub async fn setup_review(
    pool: &SqlitePool,
    review_type: &str,
    config: &ReviewConfig,
) -> Result<ReviewSetup> {
    let review_type = review_type.trim();
    if review_type.is_empty() {
        return Err(Error::InvalidInput("review_type is required".to_string()));
    }

    let mut tx = pool.begin().await?;

    let ids = catalog::select_pending_ids(&mut *tx, config.batch_size.max(0)).await?;
    let session = ReviewSession::new(
        review_type,
        ids.len() as i64,
        Duration::hours(config.ttl_hours),
        time::now(),
    );
    sessions::save_session(&mut *tx, &session).await?;
    for id in &ids {
        catalog::tag_for_review(&mut *tx, *id, &session.session_id).await?;
    }

    tx.commit().await?;

    info!(
        session_id = %session.session_id,
        images_queued = ids.len(),
        "Review batch queued"
    );

    Ok(ReviewSetup {
        review_url: format!("{}?session={}", config.review_url_base, session.session_id),
        images_queued: ids.len(),
        session,
    })
}

/// Current status of a session (or the newest active one when no id is given)
///
/// Terminal sessions are returned exactly as stored. An active session past
/// its deadline is expired and persisted first; otherwise its tallies are
/// recounted from the recorded verdicts and the completion rule applied.
pub async fn get_status(pool: &SqlitePool, session_id: Option<&str>) -> Result<ReviewStatusReport> {
    let session = match session_id {
        Some(id) => sessions::load_session(pool, id).await?,
        None => sessions::latest_active_session(pool).await?,
    };

    let mut session = session.ok_or_else(|| match session_id {
        Some(id) => Error::NotFound(format!("Review session not found: {}", id)),
        None => Error::NotFound("No active review session".to_string()),
    })?;

    if session.is_terminal() {
        return Ok(ReviewStatusReport::from(&session));
    }

    let now = time::now();
    if session.expire(now) {
        sessions::save_session(pool, &session).await?;
        info!(session_id = %session.session_id, "Review session expired");
        return Ok(ReviewStatusReport::from(&session));
    }

    let tally = sessions::tally_session(pool, &session.session_id).await?;
    session.record_progress(tally);
    if session.try_complete(now) {
        info!(
            session_id = %session.session_id,
            approved = session.images_approved,
            rejected = session.images_rejected,
            duplicates = session.images_duplicates,
            "Review session completed"
        );
    }
    sessions::save_session(pool, &session).await?;

    Ok(ReviewStatusReport::from(&session))
}
