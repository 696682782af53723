//! Learning pattern snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics from one feedback learning cycle.
///
/// Write-once. `excluded_urls` lists the rejected and duplicate urls present
/// when the cycle ran; it goes stale as soon as the catalog changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPattern {
    /// Storage id; None until persisted
    pub id: Option<i64>,
    pub cycle_timestamp: DateTime<Utc>,
    pub approved_count: usize,
    pub rejected_count: usize,
    pub duplicate_count: usize,
    pub excluded_urls: Vec<String>,
    /// Base category → number of approved entries
    pub preferred_categories: BTreeMap<String, usize>,
    pub positive_keywords: Vec<String>,
    pub url_patterns: Vec<String>,
}
