//! Feedback Learner
//!
//! Full-catalog batch job run between crawls (under the batch lock):
//!
//! 1. Partition entries by training status
//! 2. `excluded_urls` = urls of rejected and duplicate entries
//! 3. Delete those entries
//! 4. Move approved entries to `curated`
//! 5. Accumulate category counts, title/description keywords and url path
//!    segments from the approved entries
//! 6. Persist the [`LearningPattern`] snapshot
//!
//! Steps 3 and 4 are best-effort per row: a failed delete or update is
//! logged, counted and skipped. Both are guarded on the status read in step
//! 1, so a verdict changed mid-cycle is left alone.

use catwalk_common::{time, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::{catalog, patterns};
use crate::models::{CatalogEntry, LearningPattern, TrainingStatus};

pub const MAX_POSITIVE_KEYWORDS: usize = 50;
pub const MAX_URL_PATTERNS: usize = 30;
const MIN_KEYWORD_LEN: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LearningStats {
    pub approved: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub excluded: usize,
    /// Approved entries kept in the catalog
    pub remaining: usize,
    pub untrained: usize,
    pub deleted: usize,
    pub curated: usize,
    pub failed_deletes: usize,
    pub failed_updates: usize,
    /// Rows whose verdict changed after the cycle read the catalog
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternSummary {
    pub preferred_categories: BTreeMap<String, usize>,
    pub positive_keywords: Vec<String>,
    pub excluded_urls_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningReport {
    pub stats: LearningStats,
    pub patterns: PatternSummary,
    pub pattern_id: i64,
    pub cancelled: bool,
    pub failures: Vec<String>,
}

/// Derive the learning snapshot from a catalog listing (no I/O)
pub fn build_pattern(entries: &[CatalogEntry], now: DateTime<Utc>) -> LearningPattern {
    let mut approved_count = 0;
    let mut rejected_count = 0;
    let mut duplicate_count = 0;
    let mut excluded_urls = Vec::new();
    let mut preferred_categories = BTreeMap::new();
    let mut keywords = OrderedSet::default();
    let mut url_patterns = OrderedSet::default();

    for entry in entries {
        match entry.training_status {
            TrainingStatus::Approved => {
                approved_count += 1;
                *preferred_categories.entry(entry.category.clone()).or_insert(0) += 1;

                let text = format!("{} {}", entry.title, entry.description).to_lowercase();
                for word in text.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
                    if word.chars().count() >= MIN_KEYWORD_LEN {
                        keywords.insert(word);
                    }
                }

                for part in entry.original_url.split('/') {
                    if !part.is_empty() && part != "http:" && part != "https:" {
                        url_patterns.insert(part);
                    }
                }
            }
            TrainingStatus::Rejected => {
                rejected_count += 1;
                excluded_urls.push(entry.original_url.clone());
            }
            TrainingStatus::Duplicate => {
                duplicate_count += 1;
                excluded_urls.push(entry.original_url.clone());
            }
            TrainingStatus::Pending | TrainingStatus::Queued | TrainingStatus::Curated => {}
        }
    }

    LearningPattern {
        id: None,
        cycle_timestamp: now,
        approved_count,
        rejected_count,
        duplicate_count,
        excluded_urls,
        preferred_categories,
        positive_keywords: keywords.into_capped(MAX_POSITIVE_KEYWORDS),
        url_patterns: url_patterns.into_capped(MAX_URL_PATTERNS),
    }
}

/// Insertion-ordered set of strings
#[derive(Default)]
struct OrderedSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl OrderedSet {
    fn insert(&mut self, value: &str) {
        if self.seen.insert(value.to_string()) {
            self.items.push(value.to_string());
        }
    }

    fn into_capped(mut self, cap: usize) -> Vec<String> {
        self.items.truncate(cap);
        self.items
    }
}

/// Run one learning cycle over the whole catalog
pub async fn apply_learning(
    pool: &SqlitePool,
    cancel: &CancellationToken,
) -> Result<LearningReport> {
    let entries = catalog::list_entries(pool).await?;
    let mut pattern = build_pattern(&entries, time::now());

    let mut stats = LearningStats {
        approved: pattern.approved_count,
        rejected: pattern.rejected_count,
        duplicates: pattern.duplicate_count,
        excluded: pattern.excluded_urls.len(),
        remaining: pattern.approved_count,
        untrained: entries
            .iter()
            .filter(|e| !e.training_status.is_reviewed())
            .count(),
        ..Default::default()
    };
    let mut failures = Vec::new();
    let mut cancelled = false;

    info!(
        approved = stats.approved,
        rejected = stats.rejected,
        duplicates = stats.duplicates,
        untrained = stats.untrained,
        "Learning cycle started"
    );

    for entry in &entries {
        if cancel.is_cancelled() {
            cancelled = true;
            warn!(
                deleted = stats.deleted,
                curated = stats.curated,
                "Learning cycle cancelled"
            );
            break;
        }

        match entry.training_status {
            TrainingStatus::Rejected | TrainingStatus::Duplicate => {
                match catalog::delete_excluded_entry(pool, entry.id).await {
                    Ok(0) => {
                        debug!(id = entry.id, url = %entry.original_url, "Verdict changed");
                        stats.skipped += 1;
                    }
                    Ok(_) => stats.deleted += 1,
                    Err(e) => {
                        warn!(
                            id = entry.id,
                            url = %entry.original_url,
                            error = %e,
                            "Failed to delete excluded entry"
                        );
                        stats.failed_deletes += 1;
                        failures.push(format!("Delete failed for {}: {}", entry.original_url, e));
                    }
                }
            }
            TrainingStatus::Approved => {
                match catalog::curate_entry(pool, entry.id).await {
                    Ok(true) => stats.curated += 1,
                    Ok(false) => {
                        debug!(id = entry.id, url = %entry.original_url, "Verdict changed");
                        stats.skipped += 1;
                    }
                    Err(e) => {
                        warn!(
                            id = entry.id,
                            url = %entry.original_url,
                            error = %e,
                            "Failed to curate approved entry"
                        );
                        stats.failed_updates += 1;
                        failures.push(format!("Update failed for {}: {}", entry.original_url, e));
                    }
                }
            }
            _ => {}
        }
    }

    let pattern_id = patterns::save_pattern(pool, &pattern).await?;
    pattern.id = Some(pattern_id);

    info!(
        pattern_id,
        deleted = stats.deleted,
        curated = stats.curated,
        failures = failures.len(),
        "Learning cycle finished"
    );

    Ok(LearningReport {
        stats,
        patterns: PatternSummary {
            preferred_categories: pattern.preferred_categories,
            positive_keywords: pattern.positive_keywords,
            excluded_urls_count: pattern.excluded_urls.len(),
        },
        pattern_id,
        cancelled,
        failures,
    })
}
