//! Plain HTTP page renderer
//!
//! Fetches the page with reqwest and parses the markup with scraper, picking
//! out `<img>` and `<a href>` elements. No script execution: lazy-loaded
//! images are picked up from their `data-src` attribute, and natural
//! dimensions come from the `width`/`height` attributes when present (0
//! otherwise).

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

use super::{PageRenderer, RenderError, RenderSession, RenderedImage, RenderedPage};

/// [`PageRenderer`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpPageRenderer {
    user_agent: String,
    timeout: Duration,
}

impl HttpPageRenderer {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }
}

#[async_trait]
impl PageRenderer for HttpPageRenderer {
    async fn open_session(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .build()
            .map_err(|e| RenderError::SessionStart(e.to_string()))?;

        Ok(Box::new(HttpRenderSession { client }))
    }
}

struct HttpRenderSession {
    client: Client,
}

#[async_trait]
impl RenderSession for HttpRenderSession {
    async fn render(&mut self, url: &Url) -> Result<RenderedPage, RenderError> {
        let navigation = |e: reqwest::Error| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url.clone()).send().await.map_err(navigation)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(navigation)?;
        debug!(page_url = %final_url, bytes = body.len(), "Fetched page");

        Ok(parse_page(final_url, &body))
    }
}

/// Build a [`RenderedPage`] from raw markup
pub(crate) fn parse_page(url: Url, html: &str) -> RenderedPage {
    let document = Html::parse_document(html);

    let images = select(&document, "img")
        .map(|img| {
            let attr = |name: &str| img.value().attr(name);
            let src = attr("data-src")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| attr("src"))
                .unwrap_or_default()
                .to_string();

            RenderedImage {
                src,
                alt: attr("alt").unwrap_or_default().to_string(),
                natural_width: attr("width").map(parse_dimension).unwrap_or(0),
                natural_height: attr("height").map(parse_dimension).unwrap_or(0),
            }
        })
        .collect();

    let links = select(&document, "a[href]")
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    RenderedPage { url, images, links }
}

/// Elements matching `css`; an unparsable selector matches nothing
fn select<'a>(document: &'a Html, css: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(selector = css, error = %e, "Invalid CSS selector");
            None
        }
    };
    selector
        .into_iter()
        .flat_map(move |selector| document.select(&selector).collect::<Vec<_>>())
}

/// "300", "300px" → 300; anything else → 0
fn parse_dimension(value: &str) -> u32 {
    let digits: String = value.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
