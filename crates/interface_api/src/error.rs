//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_sync::SyncError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("CRM error: {0}")]
    Upstream(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "crm_error"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();
        let retryable = match self {
            ApiError::Upstream(_) | ApiError::Unavailable(_) => Some(true),
            ApiError::Validation(_) => Some(false),
            _ => None,
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            retryable,
        };

        (status, Json(body)).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match &err {
            SyncError::IdentityMissing { .. } => ApiError::Validation(err.to_string()),
            SyncError::CrmSync { .. } | SyncError::TagApply { .. } | SyncError::TagRemove { .. } => {
                ApiError::Upstream(err.to_string())
            }
            SyncError::Store(source) if source.is_not_found() => ApiError::NotFound(source.to_string()),
            SyncError::Store(source) if source.is_transient() => ApiError::Unavailable(source.to_string()),
            SyncError::Store(source) => ApiError::Internal(source.to_string()),
            SyncError::InvalidEvent(message) | SyncError::Unsupported(message) => {
                ApiError::BadRequest(message.clone())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken | AuthError::TokenExpired => ApiError::Unauthorized,
            AuthError::MissingPermission(permission) => ApiError::Forbidden(permission),
        }
    }
}
