//! Axum route handlers for the relay endpoints.
//!
//! Success bodies are whatever the provider returned; failures are always
//! `{"error": "..."}` with status 400 (bad input) or 500 (everything else).

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::errors::AppError;
use crate::extraction::validate_url;
use crate::llm_client::{deepseek, gemini, LlmError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GeminiRelayRequest {
    pub model: Option<String>,
    pub contents: Value,
    #[serde(default)]
    pub config: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub content: String,
}

/// Upstream failures keep only the provider's own message.
fn relay_error(err: LlmError) -> AppError {
    match err {
        LlmError::Api { message, .. } => AppError::Relay(message),
        other => AppError::Relay(other.to_string()),
    }
}

fn bad_body(rejection: JsonRejection) -> AppError {
    AppError::Validation(rejection.body_text())
}

/// POST /api/gemini
///
/// Accepts the SDK-style `{model, contents, config}` body, calls
/// `generateContent` with the server key, and returns `{candidates}`.
pub async fn handle_gemini_relay(
    State(state): State<AppState>,
    payload: Result<Json<GeminiRelayRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(bad_body)?;
    let api_key = state
        .config
        .gemini_api_key
        .as_deref()
        .ok_or_else(|| AppError::Relay("Server missing API_KEY".to_string()))?;

    let model = request.model.as_deref().unwrap_or(gemini::MODEL);
    let body = gemini::to_rest_body(&request.contents, request.config.as_ref());

    let response = gemini::generate_content(
        &state.http,
        &state.config.gemini_base_url,
        api_key,
        model,
        &body,
    )
    .await
    .map_err(relay_error)?;

    // A blocked prompt has no candidates; relay that as an empty list.
    let candidates = response
        .get("candidates")
        .filter(|c| !c.is_null())
        .cloned()
        .unwrap_or_else(|| json!([]));
    Ok(Json(json!({ "candidates": candidates })))
}

/// POST /api/deepseek
///
/// Forwards a chat-completion payload unchanged with bearer auth and returns
/// the provider's JSON as-is.
pub async fn handle_deepseek_relay(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let api_key = state
        .config
        .deepseek_api_key
        .as_deref()
        .ok_or_else(|| AppError::Relay("Server missing DEEPSEEK_API_KEY".to_string()))?;

    let response = deepseek::chat_completion(
        &state.http,
        &state.config.deepseek_base_url,
        api_key,
        &payload,
    )
    .await
    .map_err(relay_error)?;

    Ok(Json(response))
}

/// POST /api/scrape
///
/// Best-effort extraction of a RedNote post's text. Only allow-listed hosts
/// are fetched.
pub async fn handle_scrape(
    State(state): State<AppState>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, AppError> {
    let Json(request) = payload.map_err(bad_body)?;
    let raw_url = request
        .url
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| AppError::Validation("No URL provided".to_string()))?;

    let url = validate_url(&raw_url, state.extractor.allowed_domains())
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let content = state.scraper.scrape(&url).await.map_err(|e| {
        error!("Scrape of {} failed: {e}", url);
        AppError::Relay("Failed to scrape URL".to_string())
    })?;

    Ok(Json(ScrapeResponse { content }))
}

/// Fallback for every method other than POST on the relay routes.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
