//! Downscale policy for oversized sources
//!
//! Images whose longest edge exceeds the threshold are scaled down before
//! watermarking and encoding; nothing is ever upscaled.

use image::{DynamicImage, GenericImageView};

/// Decides whether a source needs downscaling before conversion.
#[derive(Debug, Clone, Copy)]
pub struct ResizePolicy {
    pub max_edge: u32,
}

impl ResizePolicy {
    pub fn new(max_edge: u32) -> Self {
        Self { max_edge }
    }

    /// Target dimensions for an oversized image, or `None` when both edges
    /// already fit. Aspect ratio is preserved; the longest edge lands exactly
    /// on the threshold.
    pub fn decide(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width <= self.max_edge && height <= self.max_edge {
            return None;
        }

        let scale = self.max_edge as f64 / width.max(height) as f64;
        let target_width = ((width as f64 * scale).round() as u32).max(1);
        let target_height = ((height as f64 * scale).round() as u32).max(1);

        Some((target_width, target_height))
    }

    /// Downscale to the decided dimensions.
    pub fn downscale(&self, img: &DynamicImage, (width, height): (u32, u32)) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let filter = select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self::new(2000)
    }
}

/// Select a filter based on the downscale ratio: cheaper filters for heavy
/// reductions, Lanczos3 when close to the original size.
pub fn select_filter(
    orig_width: u32,
    orig_height: u32,
    new_width: u32,
    new_height: u32,
) -> image::imageops::FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        image::imageops::FilterType::Triangle
    } else if max_ratio > 1.5 {
        image::imageops::FilterType::CatmullRom
    } else {
        image::imageops::FilterType::Lanczos3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_no_resize_within_threshold() {
        let policy = ResizePolicy::new(2000);
        assert_eq!(policy.decide(800, 600), None);
        assert_eq!(policy.decide(2000, 2000), None);
        assert_eq!(policy.decide(1, 1), None);
    }

    #[test]
    fn test_landscape_resize() {
        let policy = ResizePolicy::new(2000);
        let (w, h) = policy.decide(4000, 3000).unwrap();
        assert_eq!(w, 2000);
        assert_eq!(h, 1500);
    }

    #[test]
    fn test_portrait_resize() {
        let policy = ResizePolicy::new(2000);
        let (w, h) = policy.decide(3000, 6000).unwrap();
        assert_eq!(w, 1000);
        assert_eq!(h, 2000);
    }

    #[test]
    fn test_long_edge_lands_on_threshold() {
        let policy = ResizePolicy::new(2000);
        for (w, h) in [(2001, 5), (9999, 4321), (2500, 2500)] {
            let (nw, nh) = policy.decide(w, h).unwrap();
            assert_eq!(nw.max(nh), 2000, "input {}x{}", w, h);
        }
    }

    #[test]
    fn test_aspect_ratio_preserved_within_rounding() {
        let policy = ResizePolicy::new(2000);
        let (nw, nh) = policy.decide(4096, 2304).unwrap();
        let original = 4096.0 / 2304.0;
        let resized = nw as f64 / nh as f64;
        assert!((original - resized).abs() < 0.01);
    }

    #[test]
    fn test_extreme_aspect_never_hits_zero() {
        let policy = ResizePolicy::new(2000);
        let (nw, nh) = policy.decide(100_000, 2).unwrap();
        assert_eq!(nw, 2000);
        assert!(nh >= 1);
    }

    #[test]
    fn test_downscale_produces_target_dimensions() {
        let policy = ResizePolicy::new(100);
        let img =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(400, 200, Rgba([255, 0, 0, 255])));
        let target = policy.decide(400, 200).unwrap();
        let resized = policy.downscale(&img, target);
        assert_eq!(resized.dimensions(), (100, 50));
    }

    #[test]
    fn test_select_filter_ratios() {
        use image::imageops::FilterType;
        assert_eq!(select_filter(4000, 4000, 1000, 1000), FilterType::Triangle);
        assert_eq!(select_filter(1800, 1800, 1000, 1000), FilterType::CatmullRom);
        assert_eq!(select_filter(1100, 1100, 1000, 1000), FilterType::Lanczos3);
    }
}
