//! Shared domain models
//!
//! The types that cross crate boundaries: per-image conversion outcomes, the
//! artifacts a session holds, and the batch summary reported to callers.

use bytes::Bytes;
use serde::Serialize;

use crate::bytesize::format_bytes;

/// A single converted image held by a session: the encoded bytes plus the
/// derived output filename and the name the source arrived under.
#[derive(Debug, Clone)]
pub struct SessionArtifact {
    pub filename: String,
    pub original_name: String,
    pub bytes: Bytes,
}

impl SessionArtifact {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Per-image outcome of a batch conversion. Failures carry the source name
/// and a reason; they never abort the batch.
#[derive(Debug)]
pub enum ConversionOutcome {
    Converted(SessionArtifact),
    Failed {
        original_name: String,
        reason: String,
    },
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionOutcome::Converted(_))
    }
}

/// Entry in the batch summary for one successfully converted image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedImageInfo {
    pub filename: String,
    pub original_name: String,
    /// Human-readable size, e.g. "345.2 KB"
    pub size: String,
}

/// Batch conversion result reported to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub success: bool,
    pub converted: usize,
    pub total: usize,
    pub session_id: String,
    pub images: Vec<ConvertedImageInfo>,
}

impl BatchSummary {
    /// Build the summary for a registered session. `total` is the number of
    /// images the caller submitted, successes or not.
    pub fn new(session_id: String, total: usize, artifacts: &[SessionArtifact]) -> Self {
        Self {
            success: true,
            converted: artifacts.len(),
            total,
            session_id,
            images: artifacts
                .iter()
                .map(|a| ConvertedImageInfo {
                    filename: a.filename.clone(),
                    original_name: a.original_name.clone(),
                    size: format_bytes(a.size() as u64),
                })
                .collect(),
        }
    }
}
