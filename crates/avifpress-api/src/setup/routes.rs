//! Route configuration and setup

use std::sync::Arc;

use avifpress_core::Config;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/analyze-downloads",
            post(handlers::analyze::analyze_downloads),
        )
        .route("/api/analyze-folder", post(handlers::analyze::analyze_folder))
        .route("/api/upload", post(handlers::analyze::upload))
        .route(
            "/api/convert-uploaded",
            post(handlers::convert::convert_uploaded),
        )
        .route("/api/convert-to-avif", post(handlers::convert::convert_paths))
        .route(
            "/api/download/{session_id}/{filename}",
            get(handlers::download::download_image),
        )
        .route(
            "/api/download-zip/{session_id}",
            get(handlers::download::download_zip),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();

        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}
