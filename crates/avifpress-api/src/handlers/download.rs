//! Download endpoints: single artifacts and the full session archive.

use std::sync::Arc;

use avifpress_core::AppError;
use avifpress_services::{archive_filename, stream_zip};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::error::HttpAppError;
use crate::state::AppState;

/// GET /api/download/{session_id}/{filename}
pub async fn download_image(
    Path((session_id, filename)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    let artifacts = state
        .sessions
        .artifacts(&session_id)
        .ok_or_else(|| AppError::NotFound("Session expired or not found".to_string()))?;

    let artifact = artifacts
        .into_iter()
        .find(|a| a.filename == filename)
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    tracing::info!(session_id = %session_id, filename = %artifact.filename, "Serving download");

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/avif")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.filename),
        )
        .header(header::CONTENT_LENGTH, artifact.size())
        .body(Body::from(artifact.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// GET /api/download-zip/{session_id}
pub async fn download_zip(
    Path(session_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    let artifacts = state
        .sessions
        .artifacts(&session_id)
        .ok_or_else(|| AppError::NotFound("Session expired or not found".to_string()))?;

    let zip_name = archive_filename(chrono::Utc::now());
    tracing::info!(
        session_id = %session_id,
        images = artifacts.len(),
        zip_name = %zip_name,
        "Serving session archive"
    );

    let stream = stream_zip(artifacts);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", zip_name),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}
