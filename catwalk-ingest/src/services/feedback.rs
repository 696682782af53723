//! Review feedback
//!
//! Stores a human verdict on one catalog entry. Rejections also feed the
//! learned exclusion keywords consumed by the rule compiler. Recording those
//! keywords is best-effort: a failure there is logged and the verdict stands.

use catwalk_common::{time, Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::catalog::{self, FeedbackUpdate};
use crate::db::rules::{self, RULE_EXCLUDE_KEYWORD};
use crate::db::sessions;
use crate::models::TrainingStatus;

/// Terms whose presence in a rejected entry's url or description is learned
const CONTENT_KEYWORDS: &[&str] = &[
    "poster", "trailer", "movie", "face", "headshot", "portrait", "selfie", "collage", "icon",
    "logo",
];

#[derive(Debug, Clone, Default)]
pub struct FeedbackInput {
    pub image_id: i64,
    pub approved: bool,
    pub duplicate: bool,
    pub rejection_reason: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackOutcome {
    pub image_id: i64,
    pub training_status: TrainingStatus,
    /// Exclusion keywords learned from this verdict that were not known before
    pub updated_rules: Vec<String>,
}

/// Keywords implied by a rejection reason code
pub fn reason_keywords(reason: &str) -> Vec<String> {
    let reason = reason.trim().to_lowercase();
    let mapped: &[&str] = match reason.as_str() {
        "" => &[],
        "face_shot" => &["beauty", "makeup", "portrait"],
        "poster_campaign" => &["poster", "campaign", "movie", "trailer"],
        "collage_montage" => &["collage", "montage", "grid", "compilation"],
        other => return vec![other.to_string()],
    };
    mapped.iter().map(|s| s.to_string()).collect()
}

/// Known negative terms present in the given text
pub fn content_keywords(text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    CONTENT_KEYWORDS
        .iter()
        .filter(|k| text.contains(*k))
        .map(|k| k.to_string())
        .collect()
}

pub async fn record_feedback(pool: &SqlitePool, input: FeedbackInput) -> Result<FeedbackOutcome> {
    let entry = catalog::get_entry(pool, input.image_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Catalog entry not found: {}", input.image_id)))?;

    let reason = input
        .rejection_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let (status, feedback) = if input.duplicate {
        (TrainingStatus::Duplicate, "duplicate".to_string())
    } else if input.approved {
        (TrainingStatus::Approved, "approved".to_string())
    } else {
        (TrainingStatus::Rejected, reason.unwrap_or("rejected").to_string())
    };

    let category = input
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let now = time::now();
    let update = FeedbackUpdate {
        status,
        feedback,
        notes: input.notes.clone(),
        category,
        trained_at: now,
    };

    let mut tx = pool.begin().await?;
    if !catalog::record_feedback(&mut *tx, entry.id, &update).await? {
        return Err(Error::NotFound(format!("Catalog entry not found: {}", entry.id)));
    }
    if let Some(session_id) = &entry.review_session_id {
        sessions::record_verdict(&mut *tx, session_id, entry.id, status, now).await?;
    }
    tx.commit().await?;

    let mut updated_rules = Vec::new();
    if status == TrainingStatus::Rejected {
        let mut keywords = reason.map(reason_keywords).unwrap_or_default();
        keywords.extend(content_keywords(&format!("{} {}", entry.original_url, entry.description)));

        for keyword in keywords {
            if updated_rules.contains(&keyword) {
                continue;
            }
            let recorded = rules::record_learned_rule(
                pool,
                RULE_EXCLUDE_KEYWORD,
                &keyword,
                reason,
                Some(entry.id),
                now,
            )
            .await;
            match recorded {
                Ok(true) => updated_rules.push(keyword),
                Ok(false) => {}
                Err(e) => warn!(
                    image_id = entry.id,
                    keyword = %keyword,
                    error = %e,
                    "Failed to record learned rule"
                ),
            }
        }
    }

    info!(
        image_id = entry.id,
        status = %status,
        learned = updated_rules.len(),
        "Review feedback recorded"
    );

    Ok(FeedbackOutcome {
        image_id: entry.id,
        training_status: status,
        updated_rules,
    })
}
