use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_GENERATION_PROMPT: &str = "Transform this image creatively";
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Analyze this image in detail";
pub const NO_IMAGE_ERROR: &str = "No image was generated, only text response";

/// A parsed multipart upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub data: Vec<u8>,
    pub prompt: Option<String>,
}

impl ImageUpload {
    /// The submitted prompt, or `default` when it is missing or blank.
    pub fn prompt_or(&self, default: &str) -> String {
        match self.prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
            _ => default.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub api_configured: bool,
    pub models_available: Vec<String>,
}

/// Body of `/generate-image-with-details/`.
///
/// Both outcomes are returned with 200; `success` tells them apart.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerationDetailsResponse {
    Generated {
        success: bool,
        prompt: String,
        analysis: String,
        generated_image_path: String,
        generated_image_filename: String,
        original_image: String,
    },
    TextOnly {
        success: bool,
        prompt: String,
        analysis: String,
        error: &'static str,
    },
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub filename: String,
    pub prompt: String,
    pub analysis: String,
    pub image_dimensions: String,
}
