//! Image probe - dimensions, color layout, and alpha presence
//!
//! Decodes just enough to report what the pipeline and the analyze endpoints
//! need; the decoded buffer is dropped immediately.

use std::io::Cursor;
use std::path::Path;

use avifpress_core::{format_bytes, AppError};
use image::{GenericImageView, ImageReader};
use serde::Serialize;

/// Probed attributes of a source image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProbe {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub has_alpha: bool,
    pub size: u64,
    pub size_formatted: String,
}

/// Probe encoded image bytes.
pub fn probe(data: &[u8]) -> Result<ImageProbe, AppError> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let format = reader
        .format()
        .map(|f| format!("{:?}", f).to_lowercase())
        .unwrap_or_else(|| "unknown".to_string());
    let img = reader
        .decode()
        .map_err(|e| AppError::ImageDecode(e.to_string()))?;

    let (width, height) = img.dimensions();
    let color = img.color();

    Ok(ImageProbe {
        format,
        width,
        height,
        channels: color.channel_count(),
        has_alpha: color.has_alpha(),
        size: data.len() as u64,
        size_formatted: format_bytes(data.len() as u64),
    })
}

/// Probe an image on disk.
pub async fn probe_file(path: impl AsRef<Path>) -> Result<ImageProbe, AppError> {
    let data = tokio::fs::read(path.as_ref()).await?;
    probe(&data)
}
