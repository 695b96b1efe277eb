//! Gemini adapter.
//!
//! Two payload shapes meet here: the SDK-style `{model, contents, config}`
//! body posted to the relay, and the REST `generateContent` body the relay
//! (or direct mode) sends to Google. `to_rest_body` converts the former into
//! the latter so both paths share one upstream call.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;

use super::{error_message, LlmError, LlmRequest, OutputFormat, ProviderAdapter};
use crate::llm_client::prompts::options_response_schema;
use crate::models::provider::Provider;

pub const MODEL: &str = "gemini-3-flash-preview";
const TEMPERATURE: f32 = 0.9;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    /// Absent or null when the prompt was blocked.
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiAdapter {
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    /// SDK-style body: `contents` is a single `{parts}` object, generation
    /// options and the system prompt sit in `config`.
    fn sdk_payload(&self, request: &LlmRequest) -> Value {
        let mut parts: Vec<Value> = request
            .images
            .iter()
            .map(|image| {
                json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": BASE64.encode(&image.data),
                    }
                })
            })
            .collect();
        parts.push(json!({ "text": request.prompt }));

        let mut config = Map::new();
        if let Some(system) = &request.system {
            config.insert("systemInstruction".to_string(), json!(system));
        }
        if request.output == OutputFormat::JsonOptions {
            config.insert("responseMimeType".to_string(), json!("application/json"));
            config.insert("responseSchema".to_string(), options_response_schema());
            config.insert("temperature".to_string(), json!(TEMPERATURE));
        }

        let mut payload = json!({
            "model": MODEL,
            "contents": { "parts": parts },
        });
        if !config.is_empty() {
            payload["config"] = Value::Object(config);
        }
        payload
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn relay_path(&self) -> &'static str {
        "/api/gemini"
    }

    fn relay_payload(&self, request: &LlmRequest) -> Result<Value, LlmError> {
        Ok(self.sdk_payload(request))
    }

    async fn send_direct(
        &self,
        http: &Client,
        credential: &str,
        request: &LlmRequest,
    ) -> Result<Value, LlmError> {
        let payload = self.sdk_payload(request);
        let body = to_rest_body(&payload["contents"], payload.get("config"));
        generate_content(http, &self.base_url, credential, MODEL, &body).await
    }

    fn extract_text(&self, body: &Value) -> Result<String, LlmError> {
        let response: GenerateContentResponse = serde_json::from_value(body.clone())?;

        let text: String = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts)
            .map(|parts| parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent(self.provider()));
        }
        Ok(text)
    }
}

/// Converts an SDK-style `contents`/`config` pair into a REST `generateContent` body.
///
/// `contents` may be a string, a single `{parts}` object, or an array of
/// turns. `config.systemInstruction` moves to the top level; the remaining
/// config keys become `generationConfig`.
pub fn to_rest_body(contents: &Value, config: Option<&Value>) -> Value {
    let contents = match contents {
        Value::Array(turns) => Value::Array(turns.clone()),
        Value::String(text) => json!([{ "role": "user", "parts": [{ "text": text }] }]),
        Value::Object(turn) => {
            let mut turn = turn.clone();
            turn.entry("role").or_insert_with(|| json!("user"));
            Value::Array(vec![Value::Object(turn)])
        }
        other => {
            warn!("Unexpected Gemini contents shape: {other}");
            Value::Array(vec![])
        }
    };

    let mut body = Map::new();
    body.insert("contents".to_string(), contents);

    if let Some(Value::Object(config)) = config {
        let mut generation_config = config.clone();
        if let Some(system) = generation_config.remove("systemInstruction") {
            let instruction = match system {
                Value::String(text) => json!({ "parts": [{ "text": text }] }),
                other => other,
            };
            body.insert("systemInstruction".to_string(), instruction);
        }
        if !generation_config.is_empty() {
            body.insert(
                "generationConfig".to_string(),
                Value::Object(generation_config),
            );
        }
    }

    Value::Object(body)
}

/// Calls `models/{model}:generateContent` and returns the raw response JSON.
pub async fn generate_content(
    http: &Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    body: &Value,
) -> Result<Value, LlmError> {
    let url = format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    );

    let response = http
        .post(&url)
        .header(API_KEY_HEADER, api_key)
        .json(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        warn!("Gemini API returned {}: {}", status, text);
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or(text);
        return Err(LlmError::Api {
            provider: Provider::Gemini,
            status: status.as_u16(),
            message,
        });
    }

    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::InlineImage;
    use crate::test_support::spawn;
    use axum::{extract::Path, http::HeaderMap, routing::post, Json, Router};
    use bytes::Bytes;

    fn options_request() -> LlmRequest {
        LlmRequest {
            system: None,
            prompt: "write captions".to_string(),
            images: vec![InlineImage {
                mime_type: "image/png".to_string(),
                data: Bytes::from_static(b"\x89PNG"),
            }],
            output: OutputFormat::JsonOptions,
        }
    }

    #[test]
    fn test_sdk_payload_puts_images_before_prompt() {
        let adapter = GeminiAdapter::new("http://unused".to_string());
        let payload = adapter.relay_payload(&options_request()).unwrap();

        assert_eq!(payload["model"], MODEL);
        let parts = payload["contents"]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], BASE64.encode(b"\x89PNG"));
        assert_eq!(parts[1]["text"], "write captions");
        assert_eq!(payload["config"]["responseMimeType"], "application/json");
        assert!(payload["config"]["responseSchema"].is_object());
    }

    #[test]
    fn test_text_request_has_no_config() {
        let adapter = GeminiAdapter::new("http://unused".to_string());
        let request = LlmRequest {
            output: OutputFormat::Text,
            ..options_request()
        };
        let payload = adapter.relay_payload(&request).unwrap();
        assert!(payload.get("config").is_none());
    }

    #[test]
    fn test_to_rest_body_moves_system_instruction_out_of_config() {
        let body = to_rest_body(
            &json!({ "parts": [{ "text": "hi" }] }),
            Some(&json!({ "systemInstruction": "be nice", "temperature": 0.9 })),
        );
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be nice");
        assert_eq!(body["generationConfig"]["temperature"], 0.9);
        assert!(body["generationConfig"].get("systemInstruction").is_none());
    }

    #[test]
    fn test_to_rest_body_accepts_plain_string_contents() {
        let body = to_rest_body(&json!("describe"), None);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "describe");
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts_of_first_candidate() {
        let adapter = GeminiAdapter::new("http://unused".to_string());
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "[{\"title\"" }, { "text": ": \"a\"}]" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(adapter.extract_text(&body).unwrap(), "[{\"title\": \"a\"}]");
    }

    #[test]
    fn test_extract_text_without_candidates_is_empty_content() {
        let adapter = GeminiAdapter::new("http://unused".to_string());
        let err = adapter.extract_text(&json!({ "candidates": [] })).unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent(Provider::Gemini)));
    }

    #[test]
    fn test_blocked_prompt_is_empty_content() {
        let adapter = GeminiAdapter::new("http://unused".to_string());
        for body in [
            json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
            json!({ "candidates": null }),
            json!({ "candidates": [{ "content": { "parts": null } }] }),
        ] {
            let err = adapter.extract_text(&body).unwrap_err();
            assert!(
                matches!(err, LlmError::EmptyContent(Provider::Gemini)),
                "{body} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_send_direct_uses_key_header_and_model_path() {
        let upstream = Router::new().route(
            "/models/:call",
            post(|Path(call): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                let key = headers
                    .get(API_KEY_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let echoed = format!(
                    "{call}|{key}|{}",
                    body["generationConfig"]["responseMimeType"]
                        .as_str()
                        .unwrap_or_default()
                );
                Json(json!({ "candidates": [{ "content": { "parts": [{ "text": echoed }] } }] }))
            }),
        );
        let adapter = GeminiAdapter::new(spawn(upstream).await);

        let raw = adapter
            .send_direct(&Client::new(), "g-key", &options_request())
            .await
            .unwrap();
        let text = adapter.extract_text(&raw).unwrap();
        assert_eq!(
            text,
            format!("{MODEL}:generateContent|g-key|application/json")
        );
    }

    #[tokio::test]
    async fn test_generate_content_reports_google_error_message() {
        let upstream = Router::new().route(
            "/models/:call",
            post(|| async {
                (
                    axum::http::StatusCode::FORBIDDEN,
                    Json(json!({ "error": { "code": 403, "message": "API key not valid" } })),
                )
            }),
        );
        let base = spawn(upstream).await;
        let err = generate_content(&Client::new(), &base, "bad", MODEL, &json!({}))
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message, .. } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}
