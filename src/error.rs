/*
 * Responsibility
 * - Application-wide AppError
 * - IntoResponse (HTTP status + JSON error body)
 * - Authentication failures are rendered by FailureResponder (always 401)
 */
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::auth::failure::FailureResponder;
use crate::services::auth::AuthError;
use crate::services::auth::credential_store::StoreError;

/// JSON error body shared by every non-2xx response: `{"error": .., "message": ..}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Unauthorized(err) => return FailureResponder::respond(&err),
            AppError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", message)
            }
            AppError::Conflict(message) => (StatusCode::CONFLICT, "Conflict", message),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal",
                "internal server error".to_string(),
            ),
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

// Malformed, oversized or non-JSON bodies get the shared error body instead of axum's text.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(id) => AppError::Conflict(format!("username {id} is already taken")),
            // The store lost a principal it just returned; nothing the client can fix.
            StoreError::NotFound(_) => AppError::Internal,
            StoreError::Unavailable(_) => AppError::Unauthorized(AuthError::StoreUnavailable),
        }
    }
}
