//! Error types for airplay-ls
//!
//! Every failure leaves the service as `{"code": <status>, "errors": [..]}`.
//! An empty history or chart is a success, never one of these.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown operation (404)
    #[error("Unknown operation: {0}")]
    NotFound(String),

    /// Missing or malformed request argument (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Ledger error; status depends on the variant
    #[error(transparent)]
    Ledger(#[from] airplay_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use airplay_common::Error as LedgerError;

        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "code": status.as_u16(),
            "errors": [self.to_string()],
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
