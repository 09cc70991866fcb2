//! Avifpress Core Library
//!
//! This crate provides the shared domain models, error types, configuration,
//! and formatting helpers used across all avifpress components.

pub mod bytesize;
pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use bytesize::format_bytes;
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{BatchSummary, ConversionOutcome, ConvertedImageInfo, SessionArtifact};
