use super::generate::attachment;
use crate::error::RelayError;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

/// Serve a generated image from the output directory.
pub async fn download_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, RelayError> {
    let data = state.storage.read(&filename).await?;

    tracing::info!(filename = %filename, size = data.len(), "Image download completed");

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&filename)),
        ],
        data,
    )
        .into_response())
}
