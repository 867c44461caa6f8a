use crate::dtos::{HealthResponse, RootResponse};
use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::BTreeMap;

pub const SERVICE_NAME: &str = "image-relay-service";

/// Static description of the API.
pub async fn root() -> impl IntoResponse {
    let endpoints = BTreeMap::from([
        (
            "/generate-image/",
            "POST - Generate new image based on uploaded image + prompt",
        ),
        (
            "/generate-image-with-details/",
            "POST - Generate new image and return its location with the model's text as JSON",
        ),
        ("/analyze-image/", "POST - Analyze image (text only)"),
        ("/download/{filename}", "GET - Download a generated image"),
        ("/health", "GET - Health check"),
        ("/metrics", "GET - Prometheus metrics"),
    ]);

    Json(RootResponse {
        message: "Gemini Image Generation API",
        endpoints,
    })
}

/// Liveness plus whether an upstream credential is present.
///
/// `api_configured` only reflects that a key is set, not that it is valid.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        api_configured: state.provider.is_configured(),
        models_available: state.config.models_available(),
    })
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
