//! Error types for coursetrack.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for coursetrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for coursetrack.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid value '{value}' for query parameter '{name}'")]
    InvalidQuery { name: &'static str, value: String },

    /// Hourglass answered with a non-success status.
    #[error("Hourglass returned {status}")]
    UpstreamStatus {
        status: StatusCode,
        detail: serde_json::Value,
    },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Upstream status carried by this error, if Hourglass produced one.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            Error::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::InvalidQuery { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::UpstreamStatus { status, .. } => *status,
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Front-end expects a `detail` member on every failure
        let detail = match self {
            Error::UpstreamStatus { detail, .. } => detail,
            other => serde_json::Value::String(other.to_string()),
        };
        let body = serde_json::json!({ "detail": detail });

        (status, axum::Json(body)).into_response()
    }
}
