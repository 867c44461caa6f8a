//! Request error taxonomy for the relay endpoints.
//!
//! Every failure kind maps to exactly one HTTP status and one stable `code`
//! so clients can branch without parsing messages. The underlying message is
//! always returned as `detail`.

use crate::services::providers::ProviderError;
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] ProviderError),

    #[error("Upstream returned an unreadable image: {0}")]
    UpstreamImage(String),

    #[error("No image generated. Model response: {analysis}")]
    NoImageGenerated { analysis: String },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("File not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) | RelayError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Upstream(err) => match err {
                ProviderError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                ProviderError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            RelayError::UpstreamImage(_) => StatusCode::BAD_GATEWAY,
            RelayError::NotFound => StatusCode::NOT_FOUND,
            RelayError::NoImageGenerated { .. }
            | RelayError::Storage(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidRequest(_) => "invalid_request",
            RelayError::InvalidImage(_) => "invalid_image",
            RelayError::PayloadTooLarge(_) => "payload_too_large",
            RelayError::Upstream(ProviderError::NotConfigured(_)) => "upstream_not_configured",
            RelayError::Upstream(ProviderError::RateLimited) => "upstream_rate_limited",
            RelayError::Upstream(_) | RelayError::UpstreamImage(_) => "upstream_error",
            RelayError::NoImageGenerated { .. } => "no_image_generated",
            RelayError::Storage(_) => "storage_error",
            RelayError::NotFound => "not_found",
            RelayError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status reported by the upstream API, when there was one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            RelayError::Upstream(ProviderError::ApiError { status, .. }) => Some(*status),
            RelayError::Upstream(ProviderError::RateLimited) => Some(429),
            _ => None,
        }
    }
}

impl From<MultipartError> for RelayError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RelayError::PayloadTooLarge(err.body_text())
        } else {
            RelayError::InvalidRequest(err.body_text())
        }
    }
}

impl From<tokio::task::JoinError> for RelayError {
    fn from(err: tokio::task::JoinError) -> Self {
        RelayError::Internal(format!("Background task failed: {}", err))
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            code: &'static str,
            detail: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            upstream_status: Option<u16>,
        }

        let status = self.status();

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                code: self.code(),
                detail: self.to_string(),
                upstream_status: self.upstream_status(),
            }),
        )
            .into_response()
    }
}
