pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::generation::handlers::handle_generate;
use crate::relay::handlers::{
    handle_deepseek_relay, handle_gemini_relay, handle_scrape, method_not_allowed,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation API
        .route(
            "/api/generate",
            post(handle_generate).fallback(method_not_allowed),
        )
        // Relays: POST only, any origin
        .route(
            "/api/gemini",
            post(handle_gemini_relay).fallback(method_not_allowed),
        )
        .route(
            "/api/deepseek",
            post(handle_deepseek_relay).fallback(method_not_allowed),
        )
        .route(
            "/api/scrape",
            post(handle_scrape).fallback(method_not_allowed),
        )
        .with_state(state)
}

/// The router plus the body limit, tracing, and CORS layers the server runs with.
pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    build_router(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_reports_service() {
        let app = build_app(AppState::new(Config::for_tests()).unwrap());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "rednote-api");
    }

    #[tokio::test]
    async fn test_generate_rejects_get() {
        let app = build_app(AppState::new(Config::for_tests()).unwrap());
        let response = app
            .oneshot(Request::builder().uri("/api/generate").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let app = build_app(AppState::new(Config::for_tests()).unwrap());
        let response = app
            .oneshot(Request::builder().uri("/api/v1/context").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
