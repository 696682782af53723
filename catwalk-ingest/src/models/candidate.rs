//! Image candidates produced by a single page visit

use serde::{Deserialize, Serialize};

/// One image-bearing element found on a rendered page.
///
/// Ephemeral: produced per page visit and handed straight to the filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// Resolved absolute image URL (may be empty if the element had none)
    pub source_url: String,
    pub alt_text: String,
    /// Natural pixel width (0 when unknown)
    pub width: u32,
    /// Natural pixel height (0 when unknown)
    pub height: u32,
    /// Page the image was found on
    pub page_url: String,
}
