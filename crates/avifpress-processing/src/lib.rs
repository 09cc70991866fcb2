//! Avifpress image processing
//!
//! The conversion engine's transforms: metadata probing, the downscale
//! policy, logo watermarking, AVIF encoding, JPEG thumbnails, and the batch
//! pipeline that chains them with per-image failure isolation.

pub mod encoder;
pub mod pipeline;
pub mod probe;
pub mod resize;
pub mod thumbnail;
pub mod watermark;

pub use encoder::AvifEncoder;
pub use pipeline::{convert_image, output_filename, ConversionPipeline, SourceData, SourceImage};
pub use probe::{probe, probe_file, ImageProbe};
pub use resize::ResizePolicy;
pub use thumbnail::jpeg_thumbnail_data_url;
pub use watermark::{WatermarkPosition, WatermarkSpec};
