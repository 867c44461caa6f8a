//! Request and response bodies for the HTTP API.

pub mod relay;

pub use relay::{
    AnalysisResponse, GenerationDetailsResponse, HealthResponse, ImageUpload, RootResponse,
};
