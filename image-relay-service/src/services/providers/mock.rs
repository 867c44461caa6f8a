//! Mock provider implementation for tests and offline runs.

use super::{GenerativeProvider, OutputKind, ProviderError};
use crate::models::{InlineImage, ModelResponse, Segment};
use async_trait::async_trait;
use std::sync::Mutex;

/// A call observed by [`MockProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
    pub output: OutputKind,
    pub image_mime_type: String,
}

enum Behavior {
    /// Reply with a text segment and, for image requests, the input image.
    Echo,
    Segments(Vec<Segment>),
    Fail(ProviderError),
}

/// Scripted provider.
pub struct MockProvider {
    behavior: Behavior,
    configured: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    pub fn echo() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    /// Always answer with `segments`, regardless of the request.
    pub fn with_segments(segments: Vec<Segment>) -> Self {
        Self::with_behavior(Behavior::Segments(segments))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::with_behavior(Behavior::Fail(error))
    }

    /// Report no credential on `/health`; requests are still answered.
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            configured: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate_content(
        &self,
        model: &str,
        prompt: &str,
        image: &InlineImage,
        output: OutputKind,
    ) -> Result<ModelResponse, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                model: model.to_string(),
                prompt: prompt.to_string(),
                output,
                image_mime_type: image.mime_type.clone(),
            });
        }

        match &self.behavior {
            Behavior::Echo => {
                let mut segments = vec![Segment::Text(format!("Mock response for: {}", prompt))];
                if output == OutputKind::ImageAndText {
                    segments.push(Segment::Image(image.clone()));
                }
                Ok(ModelResponse::new(segments))
            }
            Behavior::Segments(segments) => Ok(ModelResponse::new(segments.clone())),
            Behavior::Fail(error) => Err(error.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> InlineImage {
        InlineImage {
            mime_type: "image/png".to_string(),
            data: vec![9, 9],
        }
    }

    #[tokio::test]
    async fn echo_returns_input_image_only_for_image_requests() {
        let provider = MockProvider::echo();

        let generated = provider
            .generate_content("m", "paint", &image(), OutputKind::ImageAndText)
            .await
            .unwrap()
            .into_output();
        assert_eq!(generated.image, Some(image()));
        assert_eq!(generated.text, "Mock response for: paint");

        let analysed = provider
            .generate_content("m", "look", &image(), OutputKind::Text)
            .await
            .unwrap()
            .into_output();
        assert!(analysed.image.is_none());

        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn failing_provider_returns_its_error() {
        let provider = MockProvider::failing(ProviderError::RateLimited);
        let err = provider
            .generate_content("m", "p", &image(), OutputKind::Text)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited));
    }
}
