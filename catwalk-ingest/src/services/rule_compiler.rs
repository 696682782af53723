//! Rule Compiler
//!
//! Folds learned data into a new versioned Image Filter rule set:
//! base keywords from configuration, plus exclusion keywords learned from
//! review feedback, plus the excluded urls of the latest learning cycle, plus
//! (on request) that cycle's positive keywords. Crawls pick up the highest
//! stored version when they start.

use catwalk_common::config::FilterConfig;
use catwalk_common::{time, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::rules::{self, RULE_EXCLUDE_KEYWORD};
use crate::db::patterns;
use crate::filter::{normalize_keywords, FilterRules};

/// Tokens every stored description or url contains; useless as accept keywords
const POSITIVE_STOP_WORDS: &[&str] =
    &["http", "https", "crawled", "from", "with", "this", "that", "jpeg", "webp"];

#[derive(Debug, Clone, Serialize)]
pub struct ActiveRules {
    pub rules: FilterRules,
    /// None for the configuration base set
    pub compiled_at: Option<DateTime<Utc>>,
}

/// Rules a crawl starting now should use
pub async fn load_active_rules(pool: &SqlitePool, base: &FilterConfig) -> Result<ActiveRules> {
    Ok(match rules::latest_filter_rules(pool).await? {
        Some((rules, compiled_at)) => ActiveRules {
            rules,
            compiled_at: Some(compiled_at),
        },
        None => ActiveRules {
            rules: FilterRules::from_config(base),
            compiled_at: None,
        },
    })
}

/// Compile and store the next rule set version
pub async fn compile_rules(
    pool: &SqlitePool,
    base: &FilterConfig,
    include_positive_keywords: bool,
) -> Result<ActiveRules> {
    let mut compiled = FilterRules::from_config(base);

    let learned = rules::learned_keywords(pool, RULE_EXCLUDE_KEYWORD).await?;
    compiled.exclude_keywords.extend(learned);
    compiled.exclude_keywords = normalize_keywords(&compiled.exclude_keywords);

    if let Some(pattern) = patterns::latest_pattern(pool).await? {
        compiled.excluded_urls.extend(pattern.excluded_urls);

        if include_positive_keywords {
            let positive = pattern
                .positive_keywords
                .into_iter()
                .filter(|k| !POSITIVE_STOP_WORDS.contains(&k.as_str()));
            compiled.fashion_keywords.extend(positive);
        }
    }

    // A keyword cannot both accept and reject
    let mut fashion = normalize_keywords(&compiled.fashion_keywords);
    fashion.retain(|k| !compiled.exclude_keywords.contains(k));
    compiled.fashion_keywords = fashion;

    let now = time::now();
    compiled.version = rules::save_filter_rules(pool, &compiled, now).await?;

    info!(
        version = compiled.version,
        fashion_keywords = compiled.fashion_keywords.len(),
        exclude_keywords = compiled.exclude_keywords.len(),
        excluded_urls = compiled.excluded_urls.len(),
        "Filter rules compiled"
    );

    Ok(ActiveRules {
        rules: compiled,
        compiled_at: Some(now),
    })
}
