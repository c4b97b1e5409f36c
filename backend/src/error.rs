//! Error types for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use petcare_common::Notice;
use serde_json::json;

use crate::identity::IdentityError;
use crate::retry::RetryError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not signed in")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{}", Notice::SERVER_BUSY)]
    ServerBusy,

    #[error("Identity provider error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RetryError<IdentityError>> for ApiError {
    fn from(error: RetryError<IdentityError>) -> Self {
        match error {
            RetryError::MaxRetriesReached { .. } => ApiError::ServerBusy,
            RetryError::Failed(IdentityError::NotFound(message)) => ApiError::NotFound(message),
            RetryError::Failed(IdentityError::NoSession) => ApiError::Unauthorized,
            RetryError::Failed(IdentityError::InvalidResponse(message)) => ApiError::Internal(message),
            RetryError::Failed(e) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::ServerBusy => (StatusCode::SERVICE_UNAVAILABLE, "server_busy"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
