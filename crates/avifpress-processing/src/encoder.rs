//! AVIF encoding
//!
//! Re-encodes the final pixel buffer with `ravif`. Quality comes from the
//! caller; speed is a fixed profile balancing encode time against output
//! size and is deliberately not caller-configurable.

use avifpress_core::AppError;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView};

/// Fixed encoder speed (1 = slowest/smallest, 10 = fastest).
const ENCODER_SPEED: u8 = 6;

/// AVIF encoder with a caller-supplied quality.
#[derive(Debug, Clone, Copy)]
pub struct AvifEncoder {
    pub quality: u8,
}

impl AvifEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.min(100),
        }
    }

    /// Encode the image to AVIF bytes. Sources with an alpha channel keep it;
    /// opaque sources take the cheaper RGB path.
    pub fn encode(&self, img: &DynamicImage) -> Result<Bytes, AppError> {
        let (width, height) = img.dimensions();

        let encoder = ravif::Encoder::new()
            .with_quality(self.quality as f32)
            .with_speed(ENCODER_SPEED);

        let encoded = if img.color().has_alpha() {
            let rgba_img = img.to_rgba8();
            let pixels: Vec<rgb::RGBA8> = rgba_img
                .as_raw()
                .chunks_exact(4)
                .map(|px| rgb::RGBA8::new(px[0], px[1], px[2], px[3]))
                .collect();
            let buf = ravif::Img::new(pixels.as_slice(), width as usize, height as usize);
            encoder
                .encode_rgba(buf)
                .map_err(|e| AppError::ImageEncode(e.to_string()))?
        } else {
            let rgb_img = img.to_rgb8();
            let pixels: Vec<rgb::RGB8> = rgb_img
                .as_raw()
                .chunks_exact(3)
                .map(|px| rgb::RGB8::new(px[0], px[1], px[2]))
                .collect();
            let buf = ravif::Img::new(pixels.as_slice(), width as usize, height as usize);
            encoder
                .encode_rgb(buf)
                .map_err(|e| AppError::ImageEncode(e.to_string()))?
        };

        Ok(Bytes::from(encoded.avif_file))
    }
}
