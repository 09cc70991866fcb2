//! Conversion endpoints.
//!
//! Both endpoints run the same batch pipeline and register the results as a
//! session; they differ only in how sources arrive (multipart upload vs.
//! absolute paths on the local filesystem).

use std::path::PathBuf;
use std::sync::Arc;

use avifpress_core::{AppError, BatchSummary, ConversionOutcome, SessionArtifact};
use avifpress_processing::{SourceImage, WatermarkPosition, WatermarkSpec};
use axum::{
    extract::{Multipart, State},
    Json,
};
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;

use crate::error::HttpAppError;
use crate::state::AppState;

const DEFAULT_LOGO_SIZE_PCT: u8 = 15;
const DEFAULT_LOGO_OPACITY_PCT: u8 = 70;

/// POST /api/convert-uploaded — multipart form with repeated `images` parts,
/// an optional `logo` part, and optional `quality`/`logoSize`/`logoOpacity`/
/// `logoPosition` text fields.
pub async fn convert_uploaded(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchSummary>, HttpAppError> {
    let mut sources = Vec::new();
    let mut logo: Option<Bytes> = None;
    let mut quality: Option<u8> = None;
    let mut logo_size: Option<u8> = None;
    let mut logo_opacity: Option<u8> = None;
    let mut logo_position: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await?;
                sources.push(SourceImage::from_bytes(file_name, data));
            }
            "logo" => {
                logo = Some(field.bytes().await?);
            }
            "quality" => {
                quality = Some(parse_field("quality", &field.text().await?)?);
            }
            "logoSize" => {
                logo_size = Some(parse_field("logoSize", &field.text().await?)?);
            }
            "logoOpacity" => {
                logo_opacity = Some(parse_field("logoOpacity", &field.text().await?)?);
            }
            "logoPosition" => {
                logo_position = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let watermark = logo.map(|bytes| watermark_spec(bytes, logo_size, logo_opacity, logo_position));
    run_batch(&state, sources, quality, watermark).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertPathsRequest {
    pub images: Vec<String>,
    pub quality: Option<u8>,
    /// Logo as a base64 data URL (or bare base64).
    pub logo: Option<String>,
    pub logo_size: Option<u8>,
    pub logo_opacity: Option<u8>,
    pub logo_position: Option<String>,
}

/// POST /api/convert-to-avif — JSON body naming absolute paths on the local
/// filesystem. Relative or empty paths are rejected up front.
pub async fn convert_paths(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConvertPathsRequest>,
) -> Result<Json<BatchSummary>, HttpAppError> {
    if req.images.is_empty() {
        return Err(AppError::InvalidInput("No images selected".to_string()).into());
    }

    let mut sources = Vec::with_capacity(req.images.len());
    for raw in &req.images {
        let path = PathBuf::from(raw);
        if !path.is_absolute() {
            return Err(AppError::InvalidInput(format!(
                "Image path must be absolute: {}",
                raw
            ))
            .into());
        }
        sources.push(SourceImage::from_path(path));
    }

    let watermark = match req.logo {
        Some(data_url) => Some(watermark_spec(
            decode_logo(&data_url)?,
            req.logo_size,
            req.logo_opacity,
            req.logo_position,
        )),
        None => None,
    };

    run_batch(&state, sources, req.quality, watermark).await
}

async fn run_batch(
    state: &AppState,
    sources: Vec<SourceImage>,
    quality: Option<u8>,
    watermark: Option<WatermarkSpec>,
) -> Result<Json<BatchSummary>, HttpAppError> {
    if sources.is_empty() {
        return Err(AppError::InvalidInput("No files uploaded".to_string()).into());
    }

    let _permit = state
        .batch_permits
        .acquire()
        .await
        .map_err(|_| AppError::Internal("Conversion limiter closed".to_string()))?;

    let total = sources.len();
    tracing::info!(
        total,
        quality = quality.unwrap_or(state.config.quality),
        watermark = watermark.is_some(),
        "Starting batch conversion"
    );

    let outcomes = state.pipeline(quality).convert_batch(sources, watermark).await;
    let artifacts: Vec<SessionArtifact> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            ConversionOutcome::Converted(artifact) => Some(artifact),
            ConversionOutcome::Failed { .. } => None,
        })
        .collect();

    let session_id = state.sessions.create(artifacts);
    // Re-read so the summary reflects any collision-renamed filenames
    let artifacts = state.sessions.artifacts(&session_id).unwrap_or_default();

    tracing::info!(
        session_id = %session_id,
        converted = artifacts.len(),
        total,
        "Batch conversion completed"
    );

    Ok(Json(BatchSummary::new(session_id, total, &artifacts)))
}

fn watermark_spec(
    logo: Bytes,
    size_pct: Option<u8>,
    opacity_pct: Option<u8>,
    position: Option<String>,
) -> WatermarkSpec {
    WatermarkSpec::new(
        logo,
        size_pct.unwrap_or(DEFAULT_LOGO_SIZE_PCT),
        opacity_pct.unwrap_or(DEFAULT_LOGO_OPACITY_PCT),
        WatermarkPosition::parse(position.as_deref().unwrap_or("bottom-right")),
    )
}

/// Accepts `data:image/...;base64,<payload>` or bare base64.
fn decode_logo(data_url: &str) -> Result<Bytes, AppError> {
    let payload = match data_url.split_once(',') {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => data_url,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map(Bytes::from)
        .map_err(|e| AppError::InvalidInput(format!("Invalid logo data: {}", e)))
}

fn parse_field<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("Invalid value for {}: {}", name, value)))
}
