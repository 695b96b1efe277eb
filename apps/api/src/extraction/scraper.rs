//! Server side of the extraction relay: fetch the page, pull the meta description.
//!
//! RedNote renders posts client-side and blocks most scrapers, so this only
//! works when the server-rendered HTML still carries a description tag.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, redirect, Client, Url};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use super::{validate_url, ContentSource, ExtractionError};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// Returned when the page has no description tag.
pub const FALLBACK_MESSAGE: &str = "No content extracted. RedNote blocks most scraping, \
    so copy the post text and paste it instead.";

fn description_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<meta\s+name="description"\s+content="([^"]*)""#)
            .expect("description pattern is valid")
    })
}

/// Captured `content` of the page's `<meta name="description">`, entities decoded.
pub fn extract_description(html: &str) -> Option<String> {
    description_pattern()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
}

/// Decodes named and numeric character references by letting the HTML
/// parser read the captured text back as an attribute value.
fn decode_entities(raw: &str) -> String {
    let fragment = Html::parse_fragment(&format!(r#"<span title="{raw}"></span>"#));
    Selector::parse("span")
        .ok()
        .and_then(|selector| {
            fragment
                .select(&selector)
                .next()
                .and_then(|span| span.value().attr("title"))
                .map(str::to_string)
        })
        .unwrap_or_else(|| raw.to_string())
}

/// Follows a redirect only while it stays on an allowed domain.
fn redirect_policy(allowed_domains: Vec<String>) -> redirect::Policy {
    redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        if validate_url(attempt.url().as_str(), &allowed_domains).is_ok() {
            attempt.follow()
        } else {
            let message = format!("redirect to {} leaves the allowed domains", attempt.url());
            warn!("{message}");
            attempt.error(message)
        }
    })
}

/// Fetches pages with a browser-like identity. No retries, no rendering.
#[derive(Clone)]
pub struct PageScraper {
    http: Client,
}

impl PageScraper {
    /// Builds a client whose redirects are held to `allowed_domains`.
    pub fn new(allowed_domains: Vec<String>) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .redirect(redirect_policy(allowed_domains))
            .build()?;
        Ok(Self { http })
    }

    /// Returns the description, or `FALLBACK_MESSAGE` when the page has none.
    pub async fn scrape(&self, url: &Url) -> Result<String, ExtractionError> {
        info!("Scraping {}", url);
        let html = self
            .http
            .get(url.clone())
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?
            .text()
            .await?;

        debug!("Fetched {} bytes from {}", html.len(), url);
        Ok(extract_description(&html).unwrap_or_else(|| FALLBACK_MESSAGE.to_string()))
    }
}

#[async_trait]
impl ContentSource for PageScraper {
    async fn fetch(&self, url: &Url) -> Result<String, ExtractionError> {
        self.scrape(url).await
    }
}
