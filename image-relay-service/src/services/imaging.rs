//! Image decoding, PNG normalisation and scoped temp input files.
//!
//! All functions here are CPU or disk bound and must run on the blocking
//! pool; [`stage_upload`] does that for callers.

use crate::error::RelayError;
use crate::models::InlineImage;
use image::{DynamicImage, ImageFormat};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const PNG_MIME: &str = "image/png";

/// Prefix of temp inputs staged for the generation endpoints.
pub const TEMP_INPUT_PREFIX: &str = "temp_input_";
/// Prefix of temp inputs staged for the analysis endpoint.
pub const TEMP_ANALYZE_PREFIX: &str = "temp_analyze_";

/// An upload after decoding and re-encoding as PNG.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub png: InlineImage,
    pub width: u32,
    pub height: u32,
}

/// A normalized upload together with its on-disk copy.
///
/// The temp file is deleted when this value is dropped, whichever way the
/// request ends.
pub struct StagedUpload {
    pub image: NormalizedImage,
    temp_file: NamedTempFile,
}

impl StagedUpload {
    pub fn temp_path(&self) -> &Path {
        self.temp_file.path()
    }
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Encode as PNG, converting float pixel formats the PNG encoder rejects.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let converted;
    let img = match img {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            converted = DynamicImage::ImageRgba8(img.to_rgba8());
            &converted
        }
        other => other,
    };

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}

/// Decode an upload, write it as PNG to a temp file in `dir` and read it back.
pub fn stage_upload_sync(bytes: &[u8], dir: &Path, prefix: &str) -> Result<StagedUpload, RelayError> {
    let decoded = decode(bytes).map_err(|e| RelayError::InvalidImage(e.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());
    let png = encode_png(&decoded).map_err(|e| RelayError::InvalidImage(e.to_string()))?;

    let mut temp_file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".png")
        .tempfile_in(dir)?;
    temp_file.write_all(&png)?;
    temp_file.flush()?;

    let reopened = std::fs::read(temp_file.path())?;

    tracing::debug!(
        temp_path = ?temp_file.path(),
        width,
        height,
        png_bytes = reopened.len(),
        "Staged upload"
    );

    Ok(StagedUpload {
        image: NormalizedImage {
            png: InlineImage {
                mime_type: PNG_MIME.to_string(),
                data: reopened,
            },
            width,
            height,
        },
        temp_file,
    })
}

/// [`stage_upload_sync`] on the blocking pool.
pub async fn stage_upload(
    bytes: Vec<u8>,
    dir: PathBuf,
    prefix: &'static str,
) -> Result<StagedUpload, RelayError> {
    tokio::task::spawn_blocking(move || stage_upload_sync(&bytes, &dir, prefix)).await?
}

/// Re-encode an image returned by the model as PNG.
pub async fn to_png(image: InlineImage) -> Result<Vec<u8>, RelayError> {
    tokio::task::spawn_blocking(move || {
        let decoded = decode(&image.data).map_err(|e| {
            RelayError::UpstreamImage(format!("{} ({})", e, image.mime_type))
        })?;
        encode_png(&decoded).map_err(|e| RelayError::UpstreamImage(e.to_string()))
    })
    .await?
}
