//! Content Extraction Relay, client side.
//!
//! Validates the reference URL against the domain allow-list, then asks a
//! `ContentSource` for the post text: the remote `/api/scrape` relay when one
//! is configured, otherwise the in-process scraper.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::error_message;

pub mod scraper;

/// Shorter results are treated as a failed extraction.
pub const MIN_CONTENT_CHARS: usize = 5;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("'{0}' is not a valid URL")]
    InvalidUrl(String),

    #[error("'{0}' is not a RedNote post link")]
    DisallowedDomain(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Extraction relay error (status {status}): {message}")]
    Relay { status: u16, message: String },

    #[error("Extracted content is empty or was blocked")]
    NoContent,
}

/// Anything that can turn a validated URL into post text.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, ExtractionError>;
}

/// Parses `raw` and checks that its host is an allowed domain or a subdomain of one.
pub fn validate_url(raw: &str, allowed_domains: &[String]) -> Result<Url, ExtractionError> {
    let url = Url::parse(raw.trim()).map_err(|_| ExtractionError::InvalidUrl(raw.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ExtractionError::InvalidUrl(raw.to_string()));
    }

    let host = url
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or_else(|| ExtractionError::InvalidUrl(raw.to_string()))?;

    let allowed = allowed_domains
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")));

    if allowed {
        Ok(url)
    } else {
        Err(ExtractionError::DisallowedDomain(raw.to_string()))
    }
}

/// True when extracted text is long enough and is not the scraper's fallback notice.
pub fn is_usable(content: &str) -> bool {
    let content = content.trim();
    content.chars().count() >= MIN_CONTENT_CHARS && content != scraper::FALLBACK_MESSAGE
}

/// Posts `{url}` to a remote `/api/scrape` endpoint.
pub struct RelayContentSource {
    http: Client,
    endpoint: String,
}

impl RelayContentSource {
    pub fn new(http: Client, relay_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/api/scrape", relay_url.trim_end_matches('/')),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl ContentSource for RelayContentSource {
    async fn fetch(&self, url: &Url) -> Result<String, ExtractionError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "url": url.as_str() }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| error_message(&body))
                .unwrap_or_else(|| "Server failed to extract content".to_string());
            return Err(ExtractionError::Relay {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<ScrapeResponse>().await?.content)
    }
}

/// Validates, fetches, and sanity-checks reference posts.
#[derive(Clone)]
pub struct Extractor {
    allowed_domains: Vec<String>,
    source: Arc<dyn ContentSource>,
}

impl Extractor {
    pub fn new(allowed_domains: Vec<String>, source: Arc<dyn ContentSource>) -> Self {
        Self {
            allowed_domains,
            source,
        }
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    /// Rejects disallowed URLs before any network call.
    pub async fn extract(&self, raw_url: &str) -> Result<String, ExtractionError> {
        let url = validate_url(raw_url, &self.allowed_domains)?;
        info!("Extracting reference post from {}", url);

        let content = self.source.fetch(&url).await?;
        if !is_usable(&content) {
            warn!("Extraction of {} produced no usable text", url);
            return Err(ExtractionError::NoContent);
        }
        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn domains() -> Vec<String> {
        vec!["xiaohongshu.com".to_string(), "xhslink.com".to_string()]
    }

    /// Counts calls so tests can assert nothing was fetched.
    struct CountingSource {
        calls: AtomicUsize,
        reply: String,
    }

    #[async_trait]
    impl ContentSource for CountingSource {
        async fn fetch(&self, _url: &Url) -> Result<String, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn counting(reply: &str) -> Arc<CountingSource> {
        Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        })
    }

    #[test]
    fn test_validate_accepts_domain_family() {
        assert!(validate_url("https://www.xiaohongshu.com/explore/6543", &domains()).is_ok());
        assert!(validate_url("http://xhslink.com/a/AbCd", &domains()).is_ok());
        assert!(validate_url("  https://xiaohongshu.com/x  ", &domains()).is_ok());
    }

    #[test]
    fn test_validate_rejects_lookalike_hosts() {
        for url in [
            "https://evil-xiaohongshu.com/x",
            "https://xiaohongshu.com.evil.io/x",
            "https://example.com/?q=xiaohongshu.com",
        ] {
            assert!(
                matches!(
                    validate_url(url, &domains()),
                    Err(ExtractionError::DisallowedDomain(_))
                ),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_non_http() {
        assert!(matches!(
            validate_url("file:///etc/passwd", &domains()),
            Err(ExtractionError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("not a url", &domains()),
            Err(ExtractionError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_is_usable_thresholds() {
        assert!(!is_usable("abcd"));
        assert!(!is_usable("   "));
        assert!(is_usable("abcde"));
        assert!(is_usable("五个汉字啊"));
        assert!(!is_usable(scraper::FALLBACK_MESSAGE));
    }

    #[tokio::test]
    async fn test_disallowed_domain_never_reaches_source() {
        let source = counting("plenty of text here");
        let extractor = Extractor::new(domains(), source.clone());

        let result = extractor.extract("https://www.instagram.com/p/xyz").await;
        assert!(matches!(result, Err(ExtractionError::DisallowedDomain(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_content_is_no_content() {
        let extractor = Extractor::new(domains(), counting("hi"));
        let result = extractor.extract("https://xhslink.com/a/1").await;
        assert!(matches!(result, Err(ExtractionError::NoContent)));
    }

    #[tokio::test]
    async fn test_usable_content_is_trimmed() {
        let extractor = Extractor::new(domains(), counting("  今天的穿搭分享～  \n"));
        let content = extractor.extract("https://xhslink.com/a/1").await.unwrap();
        assert_eq!(content, "今天的穿搭分享～");
    }

    #[tokio::test]
    async fn test_relay_source_posts_url_and_reads_content() {
        let relay = Router::new().route(
            "/api/scrape",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "content": format!("scraped {}", body["url"].as_str().unwrap_or("")) }))
            }),
        );
        let source = RelayContentSource::new(Client::new(), &spawn(relay).await);
        let url = Url::parse("https://xhslink.com/a/1").unwrap();
        assert_eq!(
            source.fetch(&url).await.unwrap(),
            "scraped https://xhslink.com/a/1"
        );
    }

    #[tokio::test]
    async fn test_relay_source_surfaces_error_body() {
        let relay = Router::new().route(
            "/api/scrape",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to scrape URL" })),
                )
            }),
        );
        let source = RelayContentSource::new(Client::new(), &spawn(relay).await);
        let url = Url::parse("https://xhslink.com/a/1").unwrap();
        match source.fetch(&url).await {
            Err(ExtractionError::Relay { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "Failed to scrape URL");
            }
            other => panic!("expected relay error, got {other:?}"),
        }
    }
}
