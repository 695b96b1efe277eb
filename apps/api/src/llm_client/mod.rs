/// LLM Client: the single point of entry for all provider calls.
///
/// Callers build one canonical `LlmRequest` and hand it to `ProviderRouter`,
/// which decides between calling the provider directly (a key is available)
/// or posting to a relay that holds the key server-side. Either way the
/// caller gets back the same `LlmResponse`.
///
/// Provider wire shapes live in `gemini` and `deepseek` and nowhere else.
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::provider::{Provider, ProviderChoice};

pub mod deepseek;
pub mod gemini;
pub mod prompts;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("Relay error (status {status}): {message}")]
    Relay { status: u16, message: String },

    #[error("No {0} API key available and no relay configured")]
    MissingCredential(Provider),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} returned empty content")]
    EmptyContent(Provider),
}

// ────────────────────────────────────────────────────────────────────────────
// Canonical request / response
// ────────────────────────────────────────────────────────────────────────────

/// An image sent inline with the prompt. Base64 encoding happens in the adapter.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Bytes,
}

/// What the model is asked to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Free text (image descriptions).
    Text,
    /// A JSON array of caption options.
    JsonOptions,
}

/// Provider-independent request. Adapters translate this into wire payloads.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub images: Vec<InlineImage>,
    pub output: OutputFormat,
}

/// How a request reached the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Direct,
    Relay,
}

/// Provider-independent response: the model's answer as plain text.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub provider: Provider,
    pub route: RouteKind,
    pub text: String,
}

impl LlmResponse {
    /// Tag used when minting option ids, e.g. `gemini` or `gemini-relay`.
    pub fn id_tag(&self) -> String {
        match self.route {
            RouteKind::Direct => self.provider.to_string(),
            RouteKind::Relay => format!("{}-relay", self.provider),
        }
    }
}

/// Resolved call path for one request.
pub enum Route {
    Direct { credential: String },
    Relay { base_url: String },
}

impl Route {
    pub fn kind(&self) -> RouteKind {
        match self {
            Route::Direct { .. } => RouteKind::Direct,
            Route::Relay { .. } => RouteKind::Relay,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Adapter seam
// ────────────────────────────────────────────────────────────────────────────

/// Translates the canonical request/response to and from one provider's wire shapes.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Path of this provider's relay endpoint, relative to the relay base URL.
    fn relay_path(&self) -> &'static str;

    /// The payload posted to the relay endpoint.
    fn relay_payload(&self, request: &LlmRequest) -> Result<Value, LlmError>;

    /// Calls the provider API with the given key, returning its raw JSON.
    async fn send_direct(
        &self,
        http: &Client,
        credential: &str,
        request: &LlmRequest,
    ) -> Result<Value, LlmError>;

    /// Unwraps the answer text from a raw provider (or relay) response.
    fn extract_text(&self, body: &Value) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Router
// ────────────────────────────────────────────────────────────────────────────

/// Chooses direct vs relay per request and normalizes both into `LlmResponse`.
/// No retries: every failure is returned to the caller as-is.
#[derive(Clone)]
pub struct ProviderRouter {
    http: Client,
    gemini: gemini::GeminiAdapter,
    deepseek: deepseek::DeepseekAdapter,
    gemini_key: Option<String>,
    deepseek_key: Option<String>,
    relay_url: Option<String>,
}

impl ProviderRouter {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            gemini: gemini::GeminiAdapter::new(config.gemini_base_url.clone()),
            deepseek: deepseek::DeepseekAdapter::new(config.deepseek_base_url.clone()),
            gemini_key: config.gemini_api_key.clone(),
            deepseek_key: config.deepseek_api_key.clone(),
            relay_url: config.relay_url.clone(),
        }
    }

    fn adapter(&self, provider: Provider) -> &dyn ProviderAdapter {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::Deepseek => &self.deepseek,
        }
    }

    fn env_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Gemini => self.gemini_key.as_deref(),
            Provider::Deepseek => self.deepseek_key.as_deref(),
        }
    }

    /// A usable key (user-entered first, then environment) means direct mode;
    /// otherwise the relay, if one is configured.
    pub fn route(&self, choice: &ProviderChoice) -> Result<Route, LlmError> {
        let credential = choice
            .credential
            .as_deref()
            .or_else(|| self.env_key(choice.provider))
            .filter(|key| !key.trim().is_empty());

        if let Some(credential) = credential {
            return Ok(Route::Direct {
                credential: credential.to_string(),
            });
        }

        match &self.relay_url {
            Some(base_url) => Ok(Route::Relay {
                base_url: base_url.clone(),
            }),
            None => Err(LlmError::MissingCredential(choice.provider)),
        }
    }

    pub async fn complete(
        &self,
        choice: &ProviderChoice,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let adapter = self.adapter(choice.provider);
        let route = self.route(choice)?;
        info!(
            "Calling {} via {:?} route ({} images)",
            choice.provider,
            route.kind(),
            request.images.len()
        );

        let body = match &route {
            Route::Direct { credential } => {
                adapter.send_direct(&self.http, credential, request).await?
            }
            Route::Relay { base_url } => {
                let url = format!("{}{}", base_url, adapter.relay_path());
                let payload = adapter.relay_payload(request)?;
                post_relay(&self.http, &url, &payload).await?
            }
        };

        let text = adapter.extract_text(&body)?;
        debug!("{} answered with {} chars", choice.provider, text.len());

        Ok(LlmResponse {
            provider: choice.provider,
            route: route.kind(),
            text,
        })
    }
}

/// Posts a payload to a relay endpoint. Non-success bodies carry `{ "error": ... }`.
async fn post_relay(http: &Client, url: &str, payload: &Value) -> Result<Value, LlmError> {
    let response = http.post(url).json(payload).send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    "Relay request failed".to_string()
                } else {
                    body
                }
            });
        return Err(LlmError::Relay {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json().await?)
}

/// Pulls a human-readable message out of an error body.
/// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and `{"message": "..."}`.
pub fn error_message(body: &Value) -> Option<String> {
    let candidate = match body.get("error") {
        Some(Value::String(msg)) => Some(msg.as_str()),
        Some(err) => err.get("message").and_then(Value::as_str),
        None => body.get("message").and_then(Value::as_str),
    };
    candidate
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
        .map(str::to_string)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
