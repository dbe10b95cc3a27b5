//! API Error Types
//!
//! Errors of the membership API and their HTTP responses. The body has the
//! shape `{"error": {"code", "reason", "description"}, "request_id"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::auth::AuthzError;
use crate::model::ValidationError;
use crate::store::StoreError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("{0}")]
    NotFound(String),

    /// Request conflicts with stored state
    #[error("{0}")]
    Conflict(String),

    /// Token missing, invalid or lacking a role
    #[error(transparent)]
    Auth(#[from] AuthzError),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(StoreError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            StoreError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::Store(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    #[serde(default)]
    pub request_id: String,
}

/// Error details
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub reason: String,
    pub description: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Auth(e) => match e {
                // Routes of a server without a provider do not exist
                AuthzError::Disabled => StatusCode::NOT_FOUND,
                AuthzError::MissingToken | AuthzError::BadToken(_) => StatusCode::UNAUTHORIZED,
                AuthzError::MissingRole(_) | AuthzError::MissingOneOfRoles(_) => {
                    StatusCode::FORBIDDEN
                }
                AuthzError::BadKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Store(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                status = status.as_u16(),
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                status = status.as_u16(),
                error_message = %self,
                "Request rejected"
            );
        }

        // Internals stay in the log
        let description = match &self {
            ApiError::Store(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                "The server encountered an internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Error").to_string(),
                description,
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
