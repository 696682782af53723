//! Catalog Writer
//!
//! Deduplicated, capped persistence of accepted candidates. A url already in
//! the catalog is a silent no-op. Each page may add at most `per_page_cap`
//! new rows; duplicates do not count against the cap, and candidates past it
//! are dropped. A failed insert is logged and the rest of the page continues.

use catwalk_common::config::CrawlConfig;
use catwalk_common::time;
use reqwest::Url;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::catalog;
use crate::models::{ImageCandidate, NewCatalogEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Stored(i64),
    Duplicate,
    Failed(String),
}

/// Per-page write totals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageWriteReport {
    pub stored: usize,
    pub duplicates: usize,
    pub dropped: usize,
    pub failures: Vec<String>,
}

pub struct CatalogWriter {
    pool: SqlitePool,
    per_page_cap: usize,
}

impl CatalogWriter {
    pub fn new(pool: SqlitePool, per_page_cap: usize) -> Self {
        Self { pool, per_page_cap }
    }

    /// Insert one entry, deduplicated by url
    pub async fn insert(&self, entry: &NewCatalogEntry) -> InsertOutcome {
        match catalog::insert_entry(&self.pool, entry, time::now()).await {
            Ok(Some(id)) => InsertOutcome::Stored(id),
            Ok(None) => InsertOutcome::Duplicate,
            Err(e) => InsertOutcome::Failed(e.to_string()),
        }
    }

    /// Insert the accepted entries of one page, honouring the per-page cap
    pub async fn write_page(&self, entries: Vec<NewCatalogEntry>) -> PageWriteReport {
        let mut report = PageWriteReport::default();

        for entry in entries {
            if report.stored >= self.per_page_cap {
                report.dropped += 1;
                continue;
            }

            match self.insert(&entry).await {
                InsertOutcome::Stored(id) => {
                    debug!(id, url = %entry.original_url, "Stored catalog entry");
                    report.stored += 1;
                }
                InsertOutcome::Duplicate => report.duplicates += 1,
                InsertOutcome::Failed(message) => {
                    warn!(
                        url = %entry.original_url,
                        error = %message,
                        "Failed to store catalog entry"
                    );
                    report
                        .failures
                        .push(format!("Storage error for {}: {}", entry.original_url, message));
                }
            }
        }

        report
    }
}

/// Build the catalog row for an accepted candidate
pub fn entry_from_candidate(candidate: &ImageCandidate, config: &CrawlConfig) -> NewCatalogEntry {
    let page_url = Url::parse(&candidate.page_url).ok();

    let category = page_url
        .as_ref()
        .and_then(|url| category_from_path(url.path(), &config.allowed_path_prefix))
        .unwrap_or_else(|| config.default_category.clone());

    let title = match candidate.alt_text.trim() {
        "" => {
            let host = page_url
                .as_ref()
                .and_then(|url| url.host_str().map(str::to_string))
                .unwrap_or_else(|| "the web".to_string());
            format!("Fashion look from {}", host)
        }
        alt => alt.to_string(),
    };

    NewCatalogEntry {
        original_url: candidate.source_url.trim().to_string(),
        title,
        description: format!("Crawled from {}", candidate.page_url),
        category,
        page_url: page_url.map(|u| u.to_string()),
        width: candidate.width,
        height: candidate.height,
    }
}

/// First path segment after the allowed prefix, if any
fn category_from_path(path: &str, prefix: &str) -> Option<String> {
    path.strip_prefix(prefix)?
        .split('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_lowercase())
}
