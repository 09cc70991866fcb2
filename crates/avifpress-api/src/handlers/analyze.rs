//! Analyze endpoints: list candidate images with metadata and previews.
//!
//! Scans either the configured downloads folder or a caller-supplied folder,
//! or inspects directly uploaded files. Every image in the result carries a
//! probe, a generated description, and a small JPEG preview. Files that fail
//! to read or decode are skipped, not fatal.

use std::path::Path;
use std::sync::Arc;

use avifpress_core::AppError;
use avifpress_processing::{jpeg_thumbnail_data_url, probe, ImageProbe};
use avifpress_services::{
    extensions_for, filter_by_period, scan_directory, DatePeriod, PeriodParam, ScannedFile,
};
use axum::{
    extract::{Multipart, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub period: Option<PeriodParam>,
    #[serde(default)]
    pub formats: Vec<String>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeFolderRequest {
    pub folder_path: String,
    pub period: Option<PeriodParam>,
    #[serde(default)]
    pub formats: Vec<String>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedImage {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub modified: DateTime<Utc>,
    pub description: String,
    pub metadata: ImageProbe,
    pub thumbnail: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub count: usize,
    pub images: Vec<AnalyzedImage>,
}

/// POST /api/analyze-downloads
pub async fn analyze_downloads(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, HttpAppError> {
    let root = state.config.scan_root.clone();
    tracing::info!(root = %root.display(), recursive = req.recursive, "Analyzing downloads folder");
    analyze_directory(&root, req).await
}

/// POST /api/analyze-folder
pub async fn analyze_folder(
    State(_state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeFolderRequest>,
) -> Result<Json<AnalyzeResponse>, HttpAppError> {
    tracing::info!(folder = %req.folder_path, recursive = req.recursive, "Analyzing folder");
    let root = std::path::PathBuf::from(&req.folder_path);
    analyze_directory(
        &root,
        AnalyzeRequest {
            period: req.period,
            formats: req.formats,
            recursive: req.recursive,
        },
    )
    .await
}

/// POST /api/upload — analyze directly uploaded files instead of a folder.
pub async fn upload(
    State(_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, HttpAppError> {
    let mut images = Vec::new();
    let mut received = 0usize;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("images") {
            continue;
        }
        let name = field
            .file_name()
            .unwrap_or("upload")
            .to_string();
        let data = field.bytes().await?;
        received += 1;

        match inspect(data.to_vec()).await {
            Ok((metadata, thumbnail)) => {
                images.push(AnalyzedImage {
                    description: describe(&metadata),
                    name,
                    path: None,
                    modified: Utc::now(),
                    metadata,
                    thumbnail,
                });
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Skipping unreadable upload");
            }
        }
    }

    if received == 0 {
        return Err(AppError::InvalidInput("No files uploaded".to_string()).into());
    }

    Ok(Json(AnalyzeResponse {
        success: true,
        count: images.len(),
        images,
    }))
}

async fn analyze_directory(
    root: &Path,
    req: AnalyzeRequest,
) -> Result<Json<AnalyzeResponse>, HttpAppError> {
    let extensions = extensions_for(&req.formats);
    let files = scan_directory(root, &extensions, req.recursive).await?;
    let period = DatePeriod::resolve(req.period);
    let files = filter_by_period(files, &period, Utc::now());

    let mut images = Vec::new();
    for file in files {
        if let Some(image) = analyze_file(file).await {
            images.push(image);
        }
    }

    tracing::info!(count = images.len(), "Analysis completed");

    Ok(Json(AnalyzeResponse {
        success: true,
        count: images.len(),
        images,
    }))
}

async fn analyze_file(file: ScannedFile) -> Option<AnalyzedImage> {
    let data = match tokio::fs::read(&file.path).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(path = %file.path, error = %e, "Skipping unreadable file");
            return None;
        }
    };

    match inspect(data).await {
        Ok((metadata, thumbnail)) => Some(AnalyzedImage {
            description: describe(&metadata),
            name: file.name,
            path: Some(file.path),
            modified: file.modified,
            metadata,
            thumbnail,
        }),
        Err(e) => {
            tracing::warn!(name = %file.name, error = %e, "Skipping undecodable image");
            None
        }
    }
}

/// Probe and thumbnail on the blocking pool; both decode the image.
async fn inspect(data: Vec<u8>) -> Result<(ImageProbe, String), AppError> {
    tokio::task::spawn_blocking(move || {
        let metadata = probe(&data)?;
        let thumbnail = jpeg_thumbnail_data_url(&data)?;
        Ok((metadata, thumbnail))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Analysis task failed: {}", e)))?
}

fn describe(probe: &ImageProbe) -> String {
    format!(
        "{} image, {}x{} pixels, {}",
        probe.format.to_uppercase(),
        probe.width,
        probe.height,
        probe.size_formatted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let probe = ImageProbe {
            format: "png".to_string(),
            width: 800,
            height: 600,
            channels: 4,
            has_alpha: true,
            size: 1536,
            size_formatted: "1.5 KB".to_string(),
        };
        assert_eq!(describe(&probe), "PNG image, 800x600 pixels, 1.5 KB");
    }

    #[test]
    fn test_analyze_request_defaults() {
        let req: AnalyzeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.period.is_none());
        assert!(req.formats.is_empty());
        assert!(!req.recursive);
    }

    #[test]
    fn test_analyze_request_with_range_period() {
        let req: AnalyzeRequest = serde_json::from_str(
            r#"{"period":{"start":"2026-01-01T00:00:00Z","end":"2026-01-02T00:00:00Z"},"formats":["png"],"recursive":true}"#,
        )
        .unwrap();
        assert!(matches!(req.period, Some(PeriodParam::Range { .. })));
        assert_eq!(req.formats, vec!["png"]);
        assert!(req.recursive);
    }
}
