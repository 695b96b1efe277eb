use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use crate::config::Config;
use crate::extraction::scraper::PageScraper;
use crate::extraction::{ContentSource, Extractor, RelayContentSource};
use crate::llm_client::ProviderRouter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Connection pool shared by provider calls and the relay endpoints.
    pub http: Client,
    pub router: ProviderRouter,
    pub extractor: Extractor,
    /// Backs `/api/scrape`, and reference extraction when no relay is configured.
    /// Owns its own client so redirects stay on allowed domains.
    pub scraper: PageScraper,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::new();
        let scraper = PageScraper::new(config.allowed_domains.clone())
            .context("Failed to build scraper HTTP client")?;

        let source: Arc<dyn ContentSource> = match &config.relay_url {
            Some(relay_url) => {
                info!("Reference extraction via relay at {relay_url}");
                Arc::new(RelayContentSource::new(http.clone(), relay_url))
            }
            None => Arc::new(scraper.clone()),
        };

        Ok(AppState {
            router: ProviderRouter::new(http.clone(), &config),
            extractor: Extractor::new(config.allowed_domains.clone(), source),
            scraper,
            http,
            config,
        })
    }
}
