//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! (`AppError`) convert into `HttpAppError` via `?` and render with a
//! consistent JSON body, status code, and log line.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use avifpress_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;

/// Error body shape shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
}

/// Wrapper type for AppError to implement IntoResponse. Needed because of
/// the orphan rule: IntoResponse is axum's, AppError lives in the core crate.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Malformed multipart bodies render as a 400 in our error shape.
impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid multipart body: {}",
            err.body_text()
        )))
    }
}

fn log_error(error: &AppError) {
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, code = error.error_code(), "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, code = error.error_code(), "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, code = error.error_code(), "Request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = Json(ErrorResponse {
            success: false,
            error: app_error.client_message(),
            code: app_error.error_code().to_string(),
        });

        (status, body).into_response()
    }
}
