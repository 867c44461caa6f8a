use super::upload::read_upload;
use crate::dtos::relay::DEFAULT_ANALYSIS_PROMPT;
use crate::dtos::AnalysisResponse;
use crate::error::RelayError;
use crate::services::pipeline;
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};

/// Describe an uploaded image with the analysis model.
pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisResponse>, RelayError> {
    let upload = read_upload(multipart).await?;
    let prompt = upload.prompt_or(DEFAULT_ANALYSIS_PROMPT);

    let analysis = pipeline::analyze(&state, upload.data, &prompt).await?;

    Ok(Json(AnalysisResponse {
        success: true,
        filename: upload.filename,
        prompt,
        image_dimensions: analysis.dimensions(),
        analysis: analysis.analysis,
    }))
}
