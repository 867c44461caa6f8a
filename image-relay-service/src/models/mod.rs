//! Domain models for the image relay service.

pub mod segment;

pub use segment::{GenerationOutput, InlineImage, ModelResponse, Segment};
