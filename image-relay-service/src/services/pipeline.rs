//! The request pipeline shared by the upload endpoints.
//!
//! decode upload -> stage temp PNG -> call model -> partition segments ->
//! drop temp file -> persist generated image.

use super::imaging::{self, StagedUpload, TEMP_ANALYZE_PREFIX, TEMP_INPUT_PREFIX};
use super::metrics::record_upstream_call;
use super::providers::OutputKind;
use super::storage::StoredArtifact;
use crate::error::RelayError;
use crate::models::GenerationOutput;
use crate::startup::AppState;
use std::time::Instant;

/// Result of an image generation request.
#[derive(Debug)]
pub struct Generation {
    pub analysis: String,
    /// `None` when the model answered with text only.
    pub artifact: Option<StoredArtifact>,
}

/// Result of an analysis request.
#[derive(Debug)]
pub struct Analysis {
    pub analysis: String,
    pub width: u32,
    pub height: u32,
}

impl Analysis {
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Run `prompt` against the generation model and persist any returned image.
pub async fn generate(state: &AppState, data: Vec<u8>, prompt: &str) -> Result<Generation, RelayError> {
    let staged = stage(state, data, TEMP_INPUT_PREFIX).await?;
    let model = state.config.models.generation_model.as_str();

    let output = call_model(state, model, prompt, &staged, OutputKind::ImageAndText).await;
    drop(staged);
    let output = output?;

    let artifact = match output.image {
        Some(image) => {
            let png = imaging::to_png(image).await?;
            let artifact = state.storage.save_png(png).await?;
            tracing::info!(filename = %artifact.filename, "Stored generated image");
            Some(artifact)
        }
        None => {
            tracing::info!(
                text_len = output.text.len(),
                "Model returned no image segment"
            );
            None
        }
    };

    Ok(Generation {
        analysis: output.text,
        artifact,
    })
}

/// Run `prompt` against the analysis model; only text is kept.
pub async fn analyze(state: &AppState, data: Vec<u8>, prompt: &str) -> Result<Analysis, RelayError> {
    let staged = stage(state, data, TEMP_ANALYZE_PREFIX).await?;
    let (width, height) = (staged.image.width, staged.image.height);
    let model = state.config.models.analysis_model.as_str();

    let output = call_model(state, model, prompt, &staged, OutputKind::Text).await;
    drop(staged);
    let output = output?;

    if output.image.is_some() {
        tracing::debug!("Ignoring image segment in analysis response");
    }

    Ok(Analysis {
        analysis: output.text,
        width,
        height,
    })
}

async fn stage(
    state: &AppState,
    data: Vec<u8>,
    prefix: &'static str,
) -> Result<StagedUpload, RelayError> {
    imaging::stage_upload(data, state.storage.root().to_path_buf(), prefix).await
}

async fn call_model(
    state: &AppState,
    model: &str,
    prompt: &str,
    staged: &StagedUpload,
    output: OutputKind,
) -> Result<GenerationOutput, RelayError> {
    let provider = state.provider.name();
    let start = Instant::now();

    tracing::info!(
        provider,
        model = %model,
        width = staged.image.width,
        height = staged.image.height,
        "Calling generative model"
    );

    let result = state
        .provider
        .generate_content(model, prompt, &staged.image.png, output)
        .await;

    let elapsed = start.elapsed();
    match &result {
        Ok(response) => {
            record_upstream_call(provider, model, "ok", elapsed);
            tracing::info!(
                provider,
                model = %model,
                segments = response.segments.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Model call completed"
            );
        }
        Err(e) => {
            record_upstream_call(provider, model, e.kind(), elapsed);
            tracing::error!(provider, model = %model, error = %e, "Model call failed");
        }
    }

    Ok(result?.into_output())
}
