//! Batch conversion pipeline
//!
//! Runs decode -> optional downscale -> optional watermark -> AVIF encode per
//! image, strictly sequentially within a batch to bound memory pressure.
//! Each image gets a hard wall-clock timeout; a failure (or timeout) is
//! folded into the outcome list and the batch continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use avifpress_core::{AppError, ConversionOutcome, SessionArtifact};
use bytes::Bytes;
use image::{GenericImageView, ImageReader};
use std::io::Cursor;

use crate::encoder::AvifEncoder;
use crate::resize::ResizePolicy;
use crate::watermark::{self, WatermarkSpec};

/// Where a source image's encoded bytes come from.
#[derive(Debug, Clone)]
pub enum SourceData {
    Bytes(Bytes),
    Path(PathBuf),
}

/// One batch entry: a source reference plus the name it arrived under.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub data: SourceData,
    pub original_name: String,
}

impl SourceImage {
    pub fn from_bytes(original_name: impl Into<String>, data: Bytes) -> Self {
        Self {
            data: SourceData::Bytes(data),
            original_name: original_name.into(),
        }
    }

    pub fn from_path(path: PathBuf) -> Self {
        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            data: SourceData::Path(path),
            original_name,
        }
    }
}

/// Batch conversion pipeline. Cheap to construct per request.
#[derive(Debug, Clone)]
pub struct ConversionPipeline {
    policy: ResizePolicy,
    quality: u8,
    timeout: Duration,
}

impl ConversionPipeline {
    pub fn new(max_edge: u32, quality: u8, timeout: Duration) -> Self {
        Self {
            policy: ResizePolicy::new(max_edge),
            quality: quality.min(100),
            timeout,
        }
    }

    /// Convert every source in order. Outcomes mirror the input sequence;
    /// successes keep their relative order and failures never abort the rest.
    pub async fn convert_batch(
        &self,
        sources: Vec<SourceImage>,
        watermark: Option<WatermarkSpec>,
    ) -> Vec<ConversionOutcome> {
        let watermark = watermark.map(Arc::new);
        let total = sources.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, source) in sources.into_iter().enumerate() {
            tracing::info!(
                current = index + 1,
                total,
                name = %source.original_name,
                "Converting image"
            );

            let outcome = self.convert_one(source, watermark.clone()).await;
            match &outcome {
                ConversionOutcome::Converted(artifact) => {
                    tracing::info!(
                        filename = %artifact.filename,
                        size = artifact.size(),
                        "Image converted"
                    );
                }
                ConversionOutcome::Failed {
                    original_name,
                    reason,
                } => {
                    tracing::warn!(name = %original_name, reason = %reason, "Image conversion failed");
                }
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn convert_one(
        &self,
        source: SourceImage,
        watermark: Option<Arc<WatermarkSpec>>,
    ) -> ConversionOutcome {
        let original_name = source.original_name;

        let data = match source.data {
            SourceData::Bytes(bytes) => bytes,
            SourceData::Path(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => Bytes::from(bytes),
                Err(e) => {
                    return ConversionOutcome::Failed {
                        original_name,
                        reason: format!("{}: {}", path.display(), e),
                    }
                }
            },
        };

        let policy = self.policy;
        let quality = self.quality;
        let task = tokio::task::spawn_blocking(move || {
            convert_image(&data, policy, quality, watermark.as_deref())
        });

        // On timeout the blocking task cannot be interrupted; it is abandoned
        // and its result discarded once it finishes.
        let result = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(AppError::Internal(format!(
                "Conversion task failed: {}",
                join_err
            ))),
            Err(_) => Err(AppError::ConversionTimeout {
                seconds: self.timeout.as_secs(),
            }),
        };

        match result {
            Ok(bytes) => ConversionOutcome::Converted(SessionArtifact {
                filename: output_filename(&original_name),
                original_name,
                bytes,
            }),
            Err(e) => ConversionOutcome::Failed {
                original_name,
                reason: e.to_string(),
            },
        }
    }
}

/// Strip the source extension and append `.avif`. No collision handling
/// here; the session store disambiguates on registration.
pub fn output_filename(original_name: &str) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| original_name.to_string());
    format!("{}.avif", stem)
}

/// The blocking half of a single conversion: decode, downscale when the
/// policy says so, watermark against the post-resize canvas, encode.
pub fn convert_image(
    data: &[u8],
    policy: ResizePolicy,
    quality: u8,
    watermark: Option<&WatermarkSpec>,
) -> Result<Bytes, AppError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()
        .map_err(|e| AppError::ImageDecode(e.to_string()))?;

    let (width, height) = img.dimensions();
    let img = match policy.decide(width, height) {
        Some(target) => {
            tracing::debug!(
                from = format!("{}x{}", width, height),
                to = format!("{}x{}", target.0, target.1),
                "Downscaling oversized image"
            );
            policy.downscale(&img, target)
        }
        None => img,
    };

    let img = match watermark {
        Some(spec) => watermark::composite(img, spec),
        None => img,
    };

    AvifEncoder::new(quality).encode(&img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watermark::WatermarkPosition;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_source(name: &str, width: u32, height: u32) -> SourceImage {
        let img = RgbaImage::from_pixel(width, height, Rgba([90, 140, 60, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        SourceImage::from_bytes(name, Bytes::from(buffer))
    }

    fn corrupt_source(name: &str) -> SourceImage {
        SourceImage::from_bytes(name, Bytes::from_static(b"\x89PNG not really"))
    }

    fn pipeline() -> ConversionPipeline {
        ConversionPipeline::new(2000, 75, Duration::from_secs(20))
    }

    #[test]
    fn test_output_filename_derivation() {
        assert_eq!(output_filename("photo.png"), "photo.avif");
        assert_eq!(output_filename("photo.JPEG"), "photo.avif");
        assert_eq!(output_filename("archive.tar.gz"), "archive.tar.avif");
        assert_eq!(output_filename("noext"), "noext.avif");
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let sources = vec![
            png_source("a.png", 64, 48),
            corrupt_source("c.bmp"),
            png_source("b.png", 32, 32),
        ];

        let outcomes = pipeline().convert_batch(sources, None).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_converted());
        assert!(!outcomes[1].is_converted());
        assert!(outcomes[2].is_converted());

        // Successes keep input order
        let names: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                ConversionOutcome::Converted(a) => Some(a.filename.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["a.avif", "b.avif"]);
    }

    #[tokio::test]
    async fn test_failed_outcome_carries_reason() {
        let outcomes = pipeline()
            .convert_batch(vec![corrupt_source("broken.bmp")], None)
            .await;

        match &outcomes[0] {
            ConversionOutcome::Failed {
                original_name,
                reason,
            } => {
                assert_eq!(original_name, "broken.bmp");
                assert!(!reason.is_empty());
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_path_is_per_image_failure() {
        let sources = vec![
            SourceImage::from_path(PathBuf::from("/nonexistent/x.png")),
            png_source("ok.png", 16, 16),
        ];

        let outcomes = pipeline().convert_batch(sources, None).await;
        assert!(!outcomes[0].is_converted());
        assert!(outcomes[1].is_converted());
    }

    #[tokio::test]
    async fn test_timeout_recorded_as_failure() {
        let tight = ConversionPipeline::new(2000, 75, Duration::ZERO);
        let outcomes = tight
            .convert_batch(vec![png_source("slow.png", 256, 256)], None)
            .await;

        match &outcomes[0] {
            ConversionOutcome::Failed { reason, .. } => {
                assert!(reason.contains("timed out"), "reason: {}", reason);
            }
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_with_watermark() {
        let logo = {
            let img = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
            let mut buffer = Vec::new();
            img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .unwrap();
            Bytes::from(buffer)
        };
        let spec = WatermarkSpec::new(logo, 15, 70, WatermarkPosition::BottomRight);

        let outcomes = pipeline()
            .convert_batch(vec![png_source("wm.png", 64, 64)], Some(spec))
            .await;
        assert!(outcomes[0].is_converted());
    }

    #[test]
    fn test_convert_image_produces_avif() {
        let img = RgbaImage::from_pixel(40, 40, Rgba([1, 2, 3, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();

        let bytes = convert_image(&buffer, ResizePolicy::new(2000), 75, None).unwrap();
        assert_eq!(&bytes[4..8], b"ftyp");
    }

    #[test]
    fn test_from_path_derives_name() {
        let source = SourceImage::from_path(PathBuf::from("/tmp/photos/cat.jpeg"));
        assert_eq!(source.original_name, "cat.jpeg");
    }
}
