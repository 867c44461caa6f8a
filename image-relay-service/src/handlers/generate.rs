use super::upload::read_upload;
use crate::dtos::relay::{DEFAULT_GENERATION_PROMPT, NO_IMAGE_ERROR};
use crate::dtos::GenerationDetailsResponse;
use crate::error::RelayError;
use crate::services::pipeline;
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

/// Longest prefix of the model's text echoed in `X-Analysis`.
const ANALYSIS_HEADER_CHARS: usize = 500;

const ORIGINAL_FILENAME_HEADER: HeaderName = HeaderName::from_static("x-original-filename");
const PROMPT_HEADER: HeaderName = HeaderName::from_static("x-prompt");
const ANALYSIS_HEADER: HeaderName = HeaderName::from_static("x-analysis");

/// Generate an image and return it as a PNG attachment.
///
/// A text-only model answer is a `no_image_generated` error here, unlike
/// [`generate_image_with_details`].
pub async fn generate_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, RelayError> {
    let upload = read_upload(multipart).await?;
    let prompt = upload.prompt_or(DEFAULT_GENERATION_PROMPT);

    let generation = pipeline::generate(&state, upload.data, &prompt).await?;
    let Some(artifact) = generation.artifact else {
        return Err(RelayError::NoImageGenerated {
            analysis: generation.analysis,
        });
    };

    let body = state.storage.read(&artifact.filename).await?;

    let analysis = if generation.analysis.is_empty() {
        "No text response".to_string()
    } else {
        generation
            .analysis
            .chars()
            .take(ANALYSIS_HEADER_CHARS)
            .collect()
    };

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (ORIGINAL_FILENAME_HEADER, header_value(&upload.filename)),
            (PROMPT_HEADER, header_value(&prompt)),
            (ANALYSIS_HEADER, header_value(&analysis)),
            (
                header::CONTENT_DISPOSITION,
                header_value(&attachment(&artifact.filename)),
            ),
        ],
        body,
    )
        .into_response())
}

/// Generate an image and describe the outcome as JSON.
///
/// A text-only model answer is reported with `success: false` and status 200.
pub async fn generate_image_with_details(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<GenerationDetailsResponse>, RelayError> {
    let upload = read_upload(multipart).await?;
    let prompt = upload.prompt_or(DEFAULT_GENERATION_PROMPT);

    let generation = pipeline::generate(&state, upload.data, &prompt).await?;

    let response = match generation.artifact {
        Some(artifact) => GenerationDetailsResponse::Generated {
            success: true,
            prompt,
            analysis: generation.analysis,
            generated_image_path: artifact.path.display().to_string(),
            generated_image_filename: artifact.filename,
            original_image: upload.filename,
        },
        None => GenerationDetailsResponse::TextOnly {
            success: false,
            prompt,
            analysis: generation.analysis,
            error: NO_IMAGE_ERROR,
        },
    };

    Ok(Json(response))
}

/// `Content-Disposition` value for downloading `filename`.
pub(crate) fn attachment(filename: &str) -> String {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{}\"", escaped)
}

/// Header-safe copy of free text: control characters become spaces.
fn header_value(text: &str) -> HeaderValue {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    HeaderValue::from_str(&cleaned).unwrap_or_else(|_| HeaderValue::from_static(""))
}
