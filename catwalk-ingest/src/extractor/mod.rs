//! Candidate Extractor
//!
//! Page rendering is an external capability behind [`PageRenderer`]; a headless
//! browser, a plain HTTP fetcher ([`HttpPageRenderer`]) or a scripted test
//! double can sit behind it. The extractor itself only turns a rendered page
//! into [`ImageCandidate`]s. It does no retries and no recovery: any error
//! surfaces to the crawl controller's per-page error boundary.

mod http;

pub use http::HttpPageRenderer;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

use crate::models::ImageCandidate;

/// Errors raised while rendering a page
#[derive(Debug, Error)]
pub enum RenderError {
    /// The rendering backend could not be started at all (fatal for a crawl)
    #[error("Failed to start render session: {0}")]
    SessionStart(String),

    /// Navigation failed (DNS, connect, reset, body read)
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// Page answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// Page did not finish loading within the per-page timeout
    #[error("Timed out after {seconds}s loading {url}")]
    Timeout { url: String, seconds: u64 },
}

/// An image-bearing element as the renderer saw it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedImage {
    /// Raw src as found on the page; may be relative
    pub src: String,
    pub alt: String,
    pub natural_width: u32,
    pub natural_height: u32,
}

/// A fully loaded page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Final URL after redirects; base for resolving relative references
    pub url: Url,
    pub images: Vec<RenderedImage>,
    /// Raw hrefs of every anchor on the page
    pub links: Vec<String>,
}

/// Factory for render sessions (one per crawl run)
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// A live rendering session; pages are rendered one at a time
#[async_trait]
pub trait RenderSession: Send {
    async fn render(&mut self, url: &Url) -> Result<RenderedPage, RenderError>;
}

/// Enumerate image candidates on a rendered page, resolving each src against
/// the page URL.
pub fn extract_candidates(page: &RenderedPage) -> Vec<ImageCandidate> {
    page.images
        .iter()
        .map(|image| {
            let src = image.src.trim();
            let source_url = if src.is_empty() {
                String::new()
            } else {
                page.url
                    .join(src)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| src.to_string())
            };

            ImageCandidate {
                source_url,
                alt_text: image.alt.trim().to_string(),
                width: image.natural_width,
                height: image.natural_height,
                page_url: page.url.to_string(),
            }
        })
        .collect()
}
