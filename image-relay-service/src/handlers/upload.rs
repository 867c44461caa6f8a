use crate::dtos::ImageUpload;
use crate::error::RelayError;
use axum::extract::Multipart;

const IMAGE_FIELD: &str = "image";
const PROMPT_FIELD: &str = "prompt";

/// Read the `image` file and optional `prompt` text out of a multipart body.
///
/// Unknown fields are skipped. The whole file is buffered in memory; the
/// router's body limit bounds its size.
pub async fn read_upload(mut multipart: Multipart) -> Result<ImageUpload, RelayError> {
    let mut image: Option<(String, Vec<u8>)> = None;
    let mut prompt: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let filename = field.file_name().unwrap_or("unnamed").to_string();
                let data = field.bytes().await?.to_vec();
                image = Some((filename, data));
            }
            Some(PROMPT_FIELD) => {
                prompt = Some(field.text().await?);
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unexpected multipart field");
            }
        }
    }

    let (filename, data) = image.ok_or_else(|| {
        RelayError::InvalidRequest(format!("Missing required file field '{}'", IMAGE_FIELD))
    })?;

    tracing::info!(
        filename = %filename,
        size = data.len(),
        has_prompt = prompt.is_some(),
        "Received upload"
    );

    Ok(ImageUpload {
        filename,
        data,
        prompt,
    })
}
