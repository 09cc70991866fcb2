//! Logo watermarking
//!
//! Scales a logo relative to the base image width, dims its alpha channel by
//! the requested opacity, and composites it at one of five anchor positions.
//! The whole stage is best-effort: any failure leaves the base image
//! untouched and the batch moves on.

use std::io::Cursor;

use bytes::Bytes;
use image::{imageops, DynamicImage, GenericImageView, ImageReader};

use crate::resize::select_filter;

/// Distance in pixels between the logo and the nearest canvas edges.
const EDGE_MARGIN: i64 = 20;

/// Anchor position for the logo overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

impl WatermarkPosition {
    /// Parse an anchor name. Unrecognized values resolve to the default
    /// (bottom-right) rather than erroring.
    pub fn parse(s: &str) -> Self {
        match s {
            "top-left" => WatermarkPosition::TopLeft,
            "top-right" => WatermarkPosition::TopRight,
            "bottom-left" => WatermarkPosition::BottomLeft,
            "bottom-right" => WatermarkPosition::BottomRight,
            "center" => WatermarkPosition::Center,
            _ => WatermarkPosition::default(),
        }
    }
}

/// Watermark parameters, shared read-only across all images of one batch.
#[derive(Debug, Clone)]
pub struct WatermarkSpec {
    pub logo: Bytes,
    /// Logo width as a percentage of the base image width (1-100).
    pub size_pct: u8,
    /// Overlay opacity (0 = invisible, 100 = the logo's own alpha).
    pub opacity_pct: u8,
    pub position: WatermarkPosition,
}

impl WatermarkSpec {
    pub fn new(logo: Bytes, size_pct: u8, opacity_pct: u8, position: WatermarkPosition) -> Self {
        Self {
            logo,
            size_pct: size_pct.clamp(1, 100),
            opacity_pct: opacity_pct.min(100),
            position,
        }
    }
}

/// Composite the logo onto the base image. Never fails: on any error the
/// original image is returned unchanged.
pub fn composite(img: DynamicImage, spec: &WatermarkSpec) -> DynamicImage {
    match try_composite(&img, spec) {
        Ok(done) => done,
        Err(e) => {
            tracing::warn!(error = %e, "Watermark failed, keeping image without overlay");
            img
        }
    }
}

fn try_composite(img: &DynamicImage, spec: &WatermarkSpec) -> Result<DynamicImage, anyhow::Error> {
    let (base_width, base_height) = img.dimensions();

    let logo = ImageReader::new(Cursor::new(spec.logo.as_ref()))
        .with_guessed_format()?
        .decode()?;
    // to_rgba8 synthesizes a fully-opaque alpha channel when the logo has none
    let mut logo = logo.to_rgba8();
    let (logo_width, logo_height) = logo.dimensions();

    // Scale to a fraction of the base width, aspect preserved, never past the
    // logo's native resolution.
    let target_width =
        ((base_width as f64 * spec.size_pct as f64 / 100.0).round() as u32).max(1);
    if target_width < logo_width {
        let target_height =
            ((logo_height as f64 * target_width as f64 / logo_width as f64).round() as u32).max(1);
        let filter = select_filter(logo_width, logo_height, target_width, target_height);
        logo = DynamicImage::ImageRgba8(logo)
            .resize_exact(target_width, target_height, filter)
            .to_rgba8();
    }

    // Uniform alpha-mask blend: only coverage is dimmed, colors are untouched.
    if spec.opacity_pct < 100 {
        let opacity = spec.opacity_pct as f32 / 100.0;
        for pixel in logo.pixels_mut() {
            pixel[3] = (pixel[3] as f32 * opacity).round() as u8;
        }
    }

    let (left, top) = placement(
        base_width as i64,
        base_height as i64,
        logo.width() as i64,
        logo.height() as i64,
        spec.position,
    );

    // overlay clips at the canvas edges, so out-of-range offsets are fine
    let mut canvas = img.to_rgba8();
    imageops::overlay(&mut canvas, &logo, left, top);

    Ok(DynamicImage::ImageRgba8(canvas))
}

fn placement(
    base_width: i64,
    base_height: i64,
    logo_width: i64,
    logo_height: i64,
    position: WatermarkPosition,
) -> (i64, i64) {
    match position {
        WatermarkPosition::TopLeft => (EDGE_MARGIN, EDGE_MARGIN),
        WatermarkPosition::TopRight => (base_width - logo_width - EDGE_MARGIN, EDGE_MARGIN),
        WatermarkPosition::BottomLeft => (EDGE_MARGIN, base_height - logo_height - EDGE_MARGIN),
        WatermarkPosition::BottomRight => (
            base_width - logo_width - EDGE_MARGIN,
            base_height - logo_height - EDGE_MARGIN,
        ),
        WatermarkPosition::Center => (
            (base_width - logo_width) / 2,
            (base_height - logo_height) / 2,
        ),
    }
}
