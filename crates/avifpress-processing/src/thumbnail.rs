//! JPEG preview thumbnails for the analyze endpoints.

use std::io::Cursor;

use avifpress_core::AppError;
use base64::Engine;
use image::{GenericImageView, ImageReader};

/// Longest edge of a preview thumbnail.
const THUMBNAIL_BOUND: u32 = 300;
const THUMBNAIL_QUALITY: f32 = 80.0;

/// Decode a source image and return a bounded JPEG preview as a
/// `data:image/jpeg;base64,...` URL.
pub fn jpeg_thumbnail_data_url(data: &[u8]) -> Result<String, AppError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()
        .map_err(|e| AppError::ImageDecode(e.to_string()))?;

    let (width, height) = img.dimensions();
    let thumb = if width <= THUMBNAIL_BOUND && height <= THUMBNAIL_BOUND {
        img
    } else {
        img.thumbnail(THUMBNAIL_BOUND, THUMBNAIL_BOUND)
    };

    let rgb = thumb.to_rgb8();
    let (thumb_width, thumb_height) = rgb.dimensions();

    let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
    comp.set_size(thumb_width as usize, thumb_height as usize);
    comp.set_quality(THUMBNAIL_QUALITY);
    comp.set_optimize_coding(true);

    let mut comp = comp
        .start_compress(Vec::new())
        .map_err(|e| AppError::ImageEncode(e.to_string()))?;
    comp.write_scanlines(&rgb)
        .map_err(|e| AppError::ImageEncode(e.to_string()))?;
    let jpeg_data = comp
        .finish()
        .map_err(|e| AppError::ImageEncode(e.to_string()))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg_data);
    Ok(format!("data:image/jpeg;base64,{}", encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([80, 120, 160, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_thumbnail_is_data_url() {
        let url = jpeg_thumbnail_data_url(&png_bytes(600, 400)).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.len() > 30);
    }

    #[test]
    fn test_thumbnail_bounded_to_300() {
        let url = jpeg_thumbnail_data_url(&png_bytes(900, 600)).unwrap();
        let b64 = url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let jpeg = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();

        let decoded = ImageReader::new(Cursor::new(&jpeg))
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(decoded.dimensions(), (300, 200));
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let url = jpeg_thumbnail_data_url(&png_bytes(100, 50)).unwrap();
        let b64 = url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let jpeg = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();

        let decoded = ImageReader::new(Cursor::new(&jpeg))
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
    }

    #[test]
    fn test_invalid_input_rejected() {
        assert!(jpeg_thumbnail_data_url(b"garbage").is_err());
    }
}
