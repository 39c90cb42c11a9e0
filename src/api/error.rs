//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// JSON error envelope returned by every failing endpoint.
#[derive(Serialize)]
pub struct ErrorEnvelope {
    status: &'static str,
    message: String,
    timestamp: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::persistence_error(msg, e))
    }
}

/// Closed error taxonomy for API endpoints. Matched explicitly; never keyed
/// by runtime type names.
pub enum ApiError {
    /// 400 - missing or malformed input
    Validation(String),
    /// 401 - bad credentials or missing/expired/invalid token
    Authentication(String),
    /// 403 - authenticated but not allowed
    Authorization(String),
    /// 404 - referenced entity absent
    NotFound(String),
    /// 500 - datastore or crypto failure; internals never reach the client
    Persistence(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Log the underlying failure with context and hide it from the client.
    pub fn persistence_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Persistence("Internal server error".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Authorization(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Persistence(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorEnvelope::new(message))).into_response()
    }
}
