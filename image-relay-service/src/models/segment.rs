//! Model response segments.
//!
//! A generation response is an ordered list of segments, each carrying either
//! a text fragment or an inline binary image.

/// Binary image payload returned inline by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One item of a model response. Never both text and image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Image(InlineImage),
}

/// Ordered response from a generative model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub segments: Vec<Segment>,
}

/// A response partitioned into its text and image parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutput {
    /// All text segments concatenated in order.
    pub text: String,
    /// The last image segment, if any.
    pub image: Option<InlineImage>,
}

impl ModelResponse {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Scan every segment once, concatenating text and keeping the last image.
    pub fn into_output(self) -> GenerationOutput {
        let mut output = GenerationOutput::default();
        let mut image_count = 0usize;

        for segment in self.segments {
            match segment {
                Segment::Text(text) => output.text.push_str(&text),
                Segment::Image(image) => {
                    image_count += 1;
                    output.image = Some(image);
                }
            }
        }

        if image_count > 1 {
            tracing::warn!(
                image_count,
                "Model returned several image segments, keeping the last one"
            );
        }

        output
    }
}
