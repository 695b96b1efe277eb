//! DeepSeek adapter (OpenAI-style chat completions, text only).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::{error_message, LlmError, LlmRequest, OutputFormat, ProviderAdapter};
use crate::models::provider::Provider;

pub const MODEL: &str = "deepseek-chat";
const TEMPERATURE: f32 = 1.1;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeepseekAdapter {
    base_url: String,
}

impl DeepseekAdapter {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }

    fn chat_payload(&self, request: &LlmRequest) -> Result<Value, LlmError> {
        if !request.images.is_empty() {
            return Err(LlmError::InvalidRequest(
                "DeepSeek accepts text only; describe the images first".to_string(),
            ));
        }

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut payload = json!({
            "model": MODEL,
            "messages": messages,
            "stream": false,
            "temperature": TEMPERATURE,
        });
        if request.output == OutputFormat::JsonOptions {
            payload["response_format"] = json!({ "type": "json_object" });
        }
        Ok(payload)
    }
}

#[async_trait]
impl ProviderAdapter for DeepseekAdapter {
    fn provider(&self) -> Provider {
        Provider::Deepseek
    }

    fn relay_path(&self) -> &'static str {
        "/api/deepseek"
    }

    fn relay_payload(&self, request: &LlmRequest) -> Result<Value, LlmError> {
        self.chat_payload(request)
    }

    async fn send_direct(
        &self,
        http: &Client,
        credential: &str,
        request: &LlmRequest,
    ) -> Result<Value, LlmError> {
        let payload = self.chat_payload(request)?;
        chat_completion(http, &self.base_url, credential, &payload).await
    }

    fn extract_text(&self, body: &Value) -> Result<String, LlmError> {
        let completion: ChatCompletion = serde_json::from_value(body.clone())?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyContent(self.provider()))
    }
}

/// Forwards a chat-completion payload with bearer auth and returns the raw response JSON.
pub async fn chat_completion(
    http: &Client,
    base_url: &str,
    api_key: &str,
    payload: &Value,
) -> Result<Value, LlmError> {
    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let response = http
        .post(&url)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        warn!("DeepSeek API returned {}: {}", status, text);
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or_else(|| "DeepSeek API Error".to_string());
        return Err(LlmError::Api {
            provider: Provider::Deepseek,
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&text)?)
}
