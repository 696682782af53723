//! Catalog entries and their training status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review outcome of a catalog entry.
///
/// This is the only place review state lives; the category field is plain
/// free text and never carries status markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    /// Stored by the crawler, not yet selected for review
    Pending,
    /// Selected into a review session, awaiting a verdict
    Queued,
    Approved,
    Rejected,
    Duplicate,
    /// Approved entry that a learning cycle has already consumed
    Curated,
}

impl TrainingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::Pending => "pending",
            TrainingStatus::Queued => "queued",
            TrainingStatus::Approved => "approved",
            TrainingStatus::Rejected => "rejected",
            TrainingStatus::Duplicate => "duplicate",
            TrainingStatus::Curated => "curated",
        }
    }

    /// True for the three human verdicts
    pub fn is_reviewed(&self) -> bool {
        matches!(
            self,
            TrainingStatus::Approved | TrainingStatus::Rejected | TrainingStatus::Duplicate
        )
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingStatus {
    type Err = catwalk_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TrainingStatus::Pending),
            "queued" => Ok(TrainingStatus::Queued),
            "approved" => Ok(TrainingStatus::Approved),
            "rejected" => Ok(TrainingStatus::Rejected),
            "duplicate" => Ok(TrainingStatus::Duplicate),
            "curated" => Ok(TrainingStatus::Curated),
            other => Err(catwalk_common::Error::Internal(format!(
                "Unknown training status: {}",
                other
            ))),
        }
    }
}

/// A row of the shared catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    /// Unique across the catalog
    pub original_url: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub page_url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub training_status: TrainingStatus,
    pub training_feedback: Option<String>,
    pub training_notes: Option<String>,
    pub review_session_id: Option<String>,
    pub crawled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub trained_at: Option<DateTime<Utc>>,
}

/// Insert payload built from an accepted candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogEntry {
    pub original_url: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub page_url: Option<String>,
    pub width: u32,
    pub height: u32,
}
