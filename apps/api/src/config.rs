use anyhow::{Context, Result};

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_ALLOWED_DOMAINS: &[&str] = &["xiaohongshu.com", "xhslink.com"];
/// Image uploads arrive base64-free in multipart, but several phone photos
/// still add up quickly.
const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Application configuration loaded from environment variables.
///
/// Provider keys are optional: without them the pipeline falls back to the
/// relay at `relay_url`, and the relay endpoints answer 500.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub gemini_base_url: String,
    pub deepseek_base_url: String,
    /// Base URL of a relay instance holding the provider keys server-side.
    pub relay_url: Option<String>,
    pub allowed_domains: Vec<String>,
    pub max_body_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY").or_else(|| optional_env("API_KEY")),
            deepseek_api_key: optional_env("DEEPSEEK_API_KEY"),
            gemini_base_url: optional_env("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            deepseek_base_url: optional_env("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DEEPSEEK_BASE_URL.to_string()),
            relay_url: optional_env("RELAY_URL").map(|url| url.trim_end_matches('/').to_string()),
            allowed_domains: optional_env("EXTRACTION_ALLOWED_DOMAINS")
                .map(|raw| parse_domain_list(&raw))
                .unwrap_or_else(default_allowed_domains),
            max_body_bytes: match optional_env("MAX_BODY_BYTES") {
                Some(raw) => raw
                    .parse::<usize>()
                    .context("MAX_BODY_BYTES must be a byte count")?,
                None => DEFAULT_MAX_BODY_BYTES,
            },
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Offline configuration: no keys, no relay, loopback upstreams.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            gemini_api_key: None,
            deepseek_api_key: None,
            gemini_base_url: "http://127.0.0.1:9".to_string(),
            deepseek_base_url: "http://127.0.0.1:9".to_string(),
            relay_url: None,
            allowed_domains: default_allowed_domains(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}

/// Reads an env var, treating empty values the same as unset ones.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_allowed_domains() -> Vec<String> {
    DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect()
}

fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_domain_list_normalizes_entries() {
        let domains = parse_domain_list(" Xiaohongshu.com, .xhslink.com ,,");
        assert_eq!(domains, vec!["xiaohongshu.com", "xhslink.com"]);
    }

    #[test]
    fn test_default_allowed_domains_cover_share_links() {
        let domains = default_allowed_domains();
        assert!(domains.contains(&"xhslink.com".to_string()));
        assert!(domains.contains(&"xiaohongshu.com".to_string()));
    }
}
