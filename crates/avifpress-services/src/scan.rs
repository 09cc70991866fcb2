//! Folder scanning for the analyze endpoints
//!
//! Lists image files under a directory (optionally recursive), with a
//! modification-time filter. Unreadable subdirectories and files are skipped
//! rather than failing the whole scan.

use std::path::{Path, PathBuf};

use avifpress_core::{format_bytes, AppError};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// One file found by a scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub size_formatted: String,
    pub modified: DateTime<Utc>,
}

/// Period selector as it appears in request bodies: either a named window
/// ("today", "24h", "48h", "72h") or an explicit start/end range.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PeriodParam {
    Named(String),
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Resolved modification-time filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePeriod {
    All,
    /// Since local midnight.
    Today,
    LastHours(i64),
    Between(DateTime<Utc>, DateTime<Utc>),
}

impl DatePeriod {
    /// Unknown named periods fall back to no filter, matching how absent
    /// parameters behave.
    pub fn resolve(param: Option<PeriodParam>) -> Self {
        match param {
            None => DatePeriod::All,
            Some(PeriodParam::Range { start, end }) => DatePeriod::Between(start, end),
            Some(PeriodParam::Named(name)) => match name.as_str() {
                "today" => DatePeriod::Today,
                "24h" => DatePeriod::LastHours(24),
                "48h" => DatePeriod::LastHours(48),
                "72h" => DatePeriod::LastHours(72),
                _ => DatePeriod::All,
            },
        }
    }

    pub fn matches(&self, modified: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match *self {
            DatePeriod::All => true,
            DatePeriod::Today => {
                modified.with_timezone(&Local).date_naive()
                    == now.with_timezone(&Local).date_naive()
                    && modified <= now
            }
            DatePeriod::LastHours(hours) => {
                now.signed_duration_since(modified) <= chrono::Duration::hours(hours)
            }
            DatePeriod::Between(start, end) => modified >= start && modified <= end,
        }
    }
}

/// Map requested format names to file extensions. An empty or unrecognized
/// selection means every common raster format except AVIF itself.
pub fn extensions_for(formats: &[String]) -> Vec<&'static str> {
    let mut extensions = Vec::new();
    for format in formats {
        match format.as_str() {
            "jpg" | "jpeg" => extensions.extend(["jpg", "jpeg"]),
            "png" => extensions.push("png"),
            "gif" => extensions.push("gif"),
            "webp" => extensions.push("webp"),
            "bmp" => extensions.push("bmp"),
            "tiff" | "tif" => extensions.extend(["tiff", "tif"]),
            "avif" => extensions.push("avif"),
            other => tracing::debug!(format = %other, "Ignoring unknown format"),
        }
    }
    if extensions.is_empty() {
        extensions = vec!["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif"];
    }
    extensions
}

/// Scan `root` for files with one of the given extensions. The root must be
/// an absolute path to an existing directory.
pub async fn scan_directory(
    root: &Path,
    extensions: &[&str],
    recursive: bool,
) -> Result<Vec<ScannedFile>, AppError> {
    if !root.is_absolute() {
        return Err(AppError::InvalidInput(format!(
            "Folder path must be absolute: {}",
            root.display()
        )));
    }
    let meta = tokio::fs::metadata(root)
        .await
        .map_err(|_| AppError::NotFound(format!("Folder not found: {}", root.display())))?;
    if !meta.is_dir() {
        return Err(AppError::InvalidInput(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Directory read interrupted");
                    break;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(_) => continue,
            };

            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
                continue;
            }
            if !file_type.is_file() || !has_extension(&path, extensions) {
                continue;
            }

            match entry.metadata().await {
                Ok(meta) => {
                    let modified = meta
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|_| Utc::now());
                    files.push(ScannedFile {
                        name: path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        path: path.to_string_lossy().into_owned(),
                        size: meta.len(),
                        size_formatted: format_bytes(meta.len()),
                        modified,
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                }
            }
        }
    }

    // Newest first
    files.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(files)
}

/// Keep only files whose modification time falls inside the period.
pub fn filter_by_period(
    mut files: Vec<ScannedFile>,
    period: &DatePeriod,
    now: DateTime<Utc>,
) -> Vec<ScannedFile> {
    files.retain(|f| period.matches(f.modified, now));
    files
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| extensions.contains(&e.as_str()))
}
