//! Error types for annot-api

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
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict (409), e.g. duplicate customId or exhausted update retries
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// annot-common error, mapped by variant
    #[error(transparent)]
    Common(#[from] annot_common::Error),
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        use annot_common::Error as E;

        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(err) => match err {
                E::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                E::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
                E::Import(msg) => (StatusCode::BAD_REQUEST, "IMPORT_REJECTED", msg),
                E::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                ref db @ E::Database(_) if db.is_unique_violation() => {
                    (StatusCode::CONFLICT, "CONFLICT", db.to_string())
                }
                ref db @ E::Database(_) if db.is_foreign_key_violation() => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    "Entity is still referenced by other records".to_string(),
                ),
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    other.to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_status_codes() {
        let cases = [
            (annot_common::Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (annot_common::Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (annot_common::Error::Import("x".into()), StatusCode::BAD_REQUEST),
            (annot_common::Error::Conflict("x".into()), StatusCode::CONFLICT),
            (annot_common::Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_unauthorized_status() {
        let response = ApiError::Unauthorized("no token".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
