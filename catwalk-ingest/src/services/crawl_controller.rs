//! Crawl Controller
//!
//! Drives a page-by-page traversal of one publication section:
//!
//! 1. Open a render session (failure here is fatal for the run)
//! 2. Pop the next URL off the FIFO frontier
//! 3. Render it under the per-page timeout
//! 4. Extract candidates, classify each, write accepted ones to the catalog
//! 5. Enqueue newly discovered same-site, same-prefix links
//!
//! Pages are visited one at a time. A navigation or extraction failure is
//! logged and recorded against the run; the page contributes nothing and the
//! crawl moves on. Cancellation is checked between pages.

use catwalk_common::config::CrawlConfig;
use reqwest::Url;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::extractor::{extract_candidates, PageRenderer, RenderError};
use crate::filter::{classify, FilterRules};
use crate::services::catalog_writer::{entry_from_candidate, CatalogWriter};

/// Recorded when a run finishes without accepting a single image
pub const NO_IMAGES_ERROR: &str = "no fashion images found";

/// Path extensions treated as HTML pages; anything else is skipped
const PAGE_EXTENSIONS: &[&str] = &["html", "htm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Success,
    Partial,
}

/// Result of one crawl run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub pages_crawled: usize,
    pub total_images_found: usize,
    pub images_accepted: usize,
    pub images_stored: usize,
    pub images_duplicate: usize,
    pub urls_discovered: usize,
    /// Number of recorded errors
    pub errors: usize,
    pub error_details: Vec<String>,
    pub status: CrawlStatus,
    pub rules_version: i64,
}

/// Same-site FIFO frontier with a visited set
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<Url>,
    seen: HashSet<String>,
    hosts: HashSet<String>,
    prefix: String,
}

impl Frontier {
    /// Seeds define the allowed hosts and are enqueued as given
    pub fn new(seeds: &[Url], prefix: &str) -> Self {
        let mut frontier = Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            hosts: seeds.iter().filter_map(|u| u.host_str().map(str::to_string)).collect(),
            prefix: prefix.to_string(),
        };
        for seed in seeds {
            if frontier.seen.insert(seed.to_string()) {
                frontier.queue.push_back(seed.clone());
            }
        }
        frontier
    }

    /// Enqueue a link if it is in scope and not yet seen. Returns whether it was added.
    pub fn offer(&mut self, url: Url) -> bool {
        if !self.admits(&url) {
            return false;
        }
        if !self.seen.insert(url.to_string()) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    pub fn next(&mut self) -> Option<Url> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Every URL ever enqueued, seeds included
    pub fn discovered(&self) -> usize {
        self.seen.len()
    }

    fn admits(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if url.fragment().is_some() || url.query().is_some() {
            return false;
        }
        match url.host_str() {
            Some(host) if self.hosts.contains(host) => {}
            _ => return false,
        }
        if !url.path().starts_with(&self.prefix) {
            return false;
        }

        let last_segment = url.path().rsplit('/').next().unwrap_or("");
        match last_segment.rsplit_once('.') {
            Some((_, ext)) => PAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
            None => true,
        }
    }
}

pub struct CrawlController {
    pool: SqlitePool,
    renderer: Arc<dyn PageRenderer>,
    config: CrawlConfig,
}

impl CrawlController {
    pub fn new(pool: SqlitePool, renderer: Arc<dyn PageRenderer>, config: CrawlConfig) -> Self {
        Self {
            pool,
            renderer,
            config,
        }
    }

    /// Run a crawl to completion. Only a render session that cannot be
    /// opened is returned as an error.
    pub async fn run(
        &self,
        rules: &FilterRules,
        cancel: &CancellationToken,
    ) -> Result<CrawlSummary, RenderError> {
        let mut errors: Vec<String> = Vec::new();

        let mut seeds = Vec::new();
        for seed in &self.config.seeds {
            match Url::parse(seed) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => seeds.push(url),
                _ => {
                    warn!(seed = %seed, "Ignoring invalid seed URL");
                    errors.push(format!("Invalid seed URL: {}", seed));
                }
            }
        }

        let mut frontier = Frontier::new(&seeds, &self.config.allowed_path_prefix);
        let writer = CatalogWriter::new(self.pool.clone(), self.config.per_page_insert_cap);
        let page_timeout = Duration::from_secs(self.config.page_timeout_secs);

        let mut session = self.renderer.open_session().await.map_err(|e| {
            error!(error = %e, "Cannot start render session; crawl aborted");
            e
        })?;

        info!(
            seeds = seeds.len(),
            max_pages = self.config.max_pages,
            rules_version = rules.version,
            "Crawl started"
        );

        let mut pages_crawled = 0;
        let mut total_images_found = 0;
        let mut images_accepted = 0;
        let mut images_stored = 0;
        let mut images_duplicate = 0;

        while pages_crawled < self.config.max_pages {
            if cancel.is_cancelled() {
                warn!(pages_crawled, "Crawl cancelled");
                errors.push("crawl cancelled".to_string());
                break;
            }

            let Some(url) = frontier.next() else {
                break;
            };
            pages_crawled += 1;

            let page = match tokio::time::timeout(page_timeout, session.render(&url)).await {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => {
                    warn!(page_url = %url, error = %e, "Page failed");
                    errors.push(format!("Error crawling {}: {}", url, e));
                    continue;
                }
                Err(_) => {
                    let e = RenderError::Timeout {
                        url: url.to_string(),
                        seconds: self.config.page_timeout_secs,
                    };
                    warn!(page_url = %url, error = %e, "Page timed out");
                    errors.push(e.to_string());
                    continue;
                }
            };

            let candidates = extract_candidates(&page);
            total_images_found += candidates.len();

            let accepted: Vec<_> = candidates
                .iter()
                .filter(|c| classify(c, rules).is_accept())
                .map(|c| entry_from_candidate(c, &self.config))
                .collect();
            images_accepted += accepted.len();

            let report = writer.write_page(accepted).await;
            images_stored += report.stored;
            images_duplicate += report.duplicates;
            errors.extend(report.failures);

            let mut new_links = 0;
            for href in &page.links {
                if let Ok(link) = page.url.join(href) {
                    if frontier.offer(link) {
                        new_links += 1;
                    }
                }
            }

            info!(
                page_url = %url,
                images = candidates.len(),
                stored = report.stored,
                new_links,
                queued = frontier.len(),
                "Page crawled"
            );
        }

        if images_accepted == 0 {
            errors.push(NO_IMAGES_ERROR.to_string());
        }

        let status = if errors.is_empty() {
            CrawlStatus::Success
        } else {
            CrawlStatus::Partial
        };

        info!(pages_crawled, images_stored, errors = errors.len(), ?status, "Crawl finished");

        Ok(CrawlSummary {
            pages_crawled,
            total_images_found,
            images_accepted,
            images_stored,
            images_duplicate,
            urls_discovered: frontier.discovered(),
            errors: errors.len(),
            error_details: errors,
            status,
            rules_version: rules.version,
        })
    }
}
