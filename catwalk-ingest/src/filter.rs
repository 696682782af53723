//! Image Filter
//!
//! Keyword/size heuristic deciding whether an image candidate is fashion
//! content worth storing. [`classify`] is pure: the same candidate and rules
//! always produce the same verdict, and nothing is mutated.
//!
//! Evaluation order:
//! 1. URL must be present, absolute http(s), and end in .jpg/.jpeg/.png/.webp
//! 2. URLs excluded by a previous learning cycle are rejected
//! 3. Any exclude keyword in url or alt text rejects (wins over everything below)
//! 4. A fashion keyword in url or alt text accepts
//! 5. Width or height above the size threshold accepts, independent of keywords
//! 6. Otherwise reject

use catwalk_common::config::FilterConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::ImageCandidate;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Rule set consumed by [`classify`].
///
/// Version 0 is the base set from configuration; compiled sets stored in the
/// database carry increasing versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    pub version: i64,
    pub fashion_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub min_dimension_px: u32,
    #[serde(default)]
    pub excluded_urls: BTreeSet<String>,
}

impl FilterRules {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            version: 0,
            fashion_keywords: normalize_keywords(&config.fashion_keywords),
            exclude_keywords: normalize_keywords(&config.exclude_keywords),
            min_dimension_px: config.min_dimension_px,
            excluded_urls: BTreeSet::new(),
        }
    }
}

impl Default for FilterRules {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

/// Lowercase, trim, drop empties and duplicates (order kept)
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptReason {
    Keyword,
    Size,
    KeywordAndSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingUrl,
    NotAbsoluteHttp,
    UnsupportedExtension,
    ExcludedUrl,
    ExcludeKeyword,
    NoFashionSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "reason")]
pub enum Classification {
    Accept(AcceptReason),
    Reject(RejectReason),
}

impl Classification {
    pub fn is_accept(&self) -> bool {
        matches!(self, Classification::Accept(_))
    }
}

/// Classify one candidate against a rule set
pub fn classify(candidate: &ImageCandidate, rules: &FilterRules) -> Classification {
    let raw_url = candidate.source_url.trim();
    if raw_url.is_empty() {
        return Classification::Reject(RejectReason::MissingUrl);
    }

    let url = match Url::parse(raw_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => url,
        _ => return Classification::Reject(RejectReason::NotAbsoluteHttp),
    };

    // Url::path() excludes the query, so "photo.jpg?w=640" passes
    let path = url.path().to_lowercase();
    if !IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Classification::Reject(RejectReason::UnsupportedExtension);
    }

    if rules.excluded_urls.contains(raw_url) {
        return Classification::Reject(RejectReason::ExcludedUrl);
    }

    let url_text = raw_url.to_lowercase();
    let alt_text = candidate.alt_text.to_lowercase();
    let mentions = |keyword: &String| {
        let keyword = keyword.to_lowercase();
        !keyword.is_empty() && (url_text.contains(&keyword) || alt_text.contains(&keyword))
    };

    if rules.exclude_keywords.iter().any(mentions) {
        return Classification::Reject(RejectReason::ExcludeKeyword);
    }

    let keyword_hit = rules.fashion_keywords.iter().any(mentions);
    let size_hit =
        candidate.width > rules.min_dimension_px || candidate.height > rules.min_dimension_px;

    match (keyword_hit, size_hit) {
        (true, true) => Classification::Accept(AcceptReason::KeywordAndSize),
        (true, false) => Classification::Accept(AcceptReason::Keyword),
        (false, true) => Classification::Accept(AcceptReason::Size),
        (false, false) => Classification::Reject(RejectReason::NoFashionSignal),
    }
}
