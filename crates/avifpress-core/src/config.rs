//! Configuration module
//!
//! Env-driven configuration with defaults suitable for a local service.
//! `.env` files are honored through `dotenvy` so local overrides don't need
//! to live in the shell profile.

use std::env;
use std::path::PathBuf;

use anyhow::Context;

const DEFAULT_SERVER_PORT: u16 = 8765;
const DEFAULT_QUALITY: u8 = 75;
const DEFAULT_MAX_EDGE: u32 = 2000;
const DEFAULT_IMAGE_TIMEOUT_SECS: u64 = 20;
const DEFAULT_SESSION_RETENTION_SECS: u64 = 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 2;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Default AVIF quality (0-100) when the caller does not supply one.
    pub quality: u8,
    /// Images whose longest edge exceeds this are downscaled before encoding.
    pub max_edge: u32,
    /// Hard wall-clock timeout for a single image conversion.
    pub image_timeout_secs: u64,
    /// How long a session stays retrievable after creation.
    pub session_retention_secs: u64,
    /// Period of the background eviction sweep.
    pub sweep_interval_secs: u64,
    /// Cap on multipart upload bodies.
    pub max_upload_bytes: usize,
    /// Cap on batches converting concurrently across requests.
    pub max_concurrent_batches: usize,
    /// Root directory scanned by the analyze-downloads operation.
    pub scan_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let scan_root = match env::var("AVIFPRESS_SCAN_ROOT") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_scan_root()?,
        };

        Ok(Self {
            server_port: parse_env("SERVER_PORT", DEFAULT_SERVER_PORT)?,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            quality: parse_env("AVIFPRESS_QUALITY", DEFAULT_QUALITY)?,
            max_edge: parse_env("AVIFPRESS_MAX_EDGE", DEFAULT_MAX_EDGE)?,
            image_timeout_secs: parse_env(
                "AVIFPRESS_IMAGE_TIMEOUT_SECS",
                DEFAULT_IMAGE_TIMEOUT_SECS,
            )?,
            session_retention_secs: parse_env(
                "AVIFPRESS_SESSION_RETENTION_SECS",
                DEFAULT_SESSION_RETENTION_SECS,
            )?,
            sweep_interval_secs: parse_env(
                "AVIFPRESS_SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )?,
            max_upload_bytes: parse_env("AVIFPRESS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            max_concurrent_batches: parse_env(
                "AVIFPRESS_MAX_CONCURRENT_BATCHES",
                DEFAULT_MAX_CONCURRENT_BATCHES,
            )?,
            scan_root,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("Invalid value for {}: {}", name, value)),
        Err(_) => Ok(default),
    }
}

fn default_scan_root() -> Result<PathBuf, anyhow::Error> {
    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .context("Neither AVIFPRESS_SCAN_ROOT nor HOME is set")?;
    Ok(PathBuf::from(home).join("Downloads"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Only assert values not plausibly overridden in a dev environment
        assert_eq!(DEFAULT_QUALITY, 75);
        assert_eq!(DEFAULT_MAX_EDGE, 2000);
        assert_eq!(DEFAULT_SESSION_RETENTION_SECS, 3600);
        assert_eq!(DEFAULT_SWEEP_INTERVAL_SECS, 600);
    }

    #[test]
    fn test_parse_env_fallback() {
        let port: u16 = parse_env("AVIFPRESS_TEST_UNSET_VAR", 8765).unwrap();
        assert_eq!(port, 8765);
    }

    #[test]
    fn test_is_production() {
        let mut config = Config {
            server_port: 8765,
            cors_origins: vec!["*".into()],
            environment: "development".into(),
            quality: 75,
            max_edge: 2000,
            image_timeout_secs: 20,
            session_retention_secs: 3600,
            sweep_interval_secs: 600,
            max_upload_bytes: 50 * 1024 * 1024,
            max_concurrent_batches: 2,
            scan_root: PathBuf::from("/tmp"),
        };
        assert!(!config.is_production());
        config.environment = "Production".into();
        assert!(config.is_production());
    }
}
