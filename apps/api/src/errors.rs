use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::pipeline::GenerationError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every variant renders as `{"error": "<message>", "code": "<CODE>"}` so that
/// relay clients can read `error` as a plain string.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Upstream provider (or relay) failure. The message is shown to the caller.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Generation failed: {0}")]
    Parse(String),

    /// Relay endpoint failure, answered with 500 and the upstream message.
    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Validation(msg) => AppError::Validation(msg),
            GenerationError::Extraction(e) => AppError::Extraction(e.to_string()),
            GenerationError::Provider(e) => AppError::Provider(e.to_string()),
            GenerationError::Parse(e) => AppError::Parse(e.to_string()),
        }
    }
}

/// Shown for every extraction failure; the underlying cause is only logged.
pub const MANUAL_PASTE_MESSAGE: &str =
    "Could not extract the reference post. Please copy the text and paste it manually.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Extraction(msg) => {
                tracing::warn!("Extraction error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_ERROR",
                    MANUAL_PASTE_MESSAGE.to_string(),
                )
            }
            AppError::Provider(msg) => {
                tracing::error!("Provider error: {msg}");
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", msg.clone())
            }
            AppError::Parse(msg) => {
                tracing::error!("Parse error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    "Generation failed, please try again".to_string(),
                )
            }
            AppError::Relay(msg) => {
                tracing::error!("Relay error: {msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "RELAY_ERROR", msg.clone())
            }
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                "Method Not Allowed".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
