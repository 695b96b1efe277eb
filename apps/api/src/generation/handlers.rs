//! Axum route handlers for the Generation API.

use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use tracing::debug;

use crate::errors::AppError;
use crate::generation::pipeline::{run_cycle, CycleOutcome, CycleRequest};
use crate::llm_client::InlineImage;
use crate::models::provider::{Provider, ProviderChoice};
use crate::models::settings::GenerationSettings;
use crate::state::AppState;

/// Used when a file part carries no content type.
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// POST /api/generate
///
/// Multipart form:
/// - `images` (repeatable file part, at least one)
/// - `settings` (JSON `GenerationSettings`)
/// - `provider` (`gemini` | `deepseek`, default `gemini`)
/// - `api_key` (optional user-supplied key for the chosen provider)
///
/// Runs one full generation cycle and returns the options plus the states it went through.
pub async fn handle_generate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CycleOutcome>, AppError> {
    let request = read_cycle_request(&mut multipart).await?;
    let outcome = run_cycle(&state.router, &state.extractor, request).await?;
    Ok(Json(outcome))
}

async fn read_cycle_request(multipart: &mut Multipart) -> Result<CycleRequest, AppError> {
    let mut settings = GenerationSettings::default();
    let mut provider = Provider::default();
    let mut api_key: Option<String> = None;
    let mut images = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e.body_text())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" | "image" => images.push(read_image(field).await?),
            "settings" => {
                let raw = read_text(field).await?;
                settings = serde_json::from_str(&raw)
                    .map_err(|e| AppError::Validation(format!("Invalid settings: {e}")))?;
            }
            "provider" => {
                provider = read_text(field)
                    .await?
                    .parse()
                    .map_err(AppError::Validation)?;
            }
            "api_key" => api_key = Some(read_text(field).await?),
            other => debug!("Ignoring unknown form field '{other}'"),
        }
    }

    Ok(CycleRequest {
        settings,
        choice: ProviderChoice::new(provider, api_key),
        images,
    })
}

async fn read_image(field: Field<'_>) -> Result<InlineImage, AppError> {
    let mime_type = field
        .content_type()
        .unwrap_or(DEFAULT_IMAGE_MIME)
        .to_string();
    if !mime_type.starts_with("image/") {
        return Err(AppError::Validation(format!(
            "Unsupported upload type '{mime_type}', expected an image"
        )));
    }

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read image: {}", e.body_text())))?;
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded image is empty".to_string()));
    }

    Ok(InlineImage { mime_type, data })
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form field: {}", e.body_text())))
}
