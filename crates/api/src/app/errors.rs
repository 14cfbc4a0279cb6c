use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use retailpos_auth::AuthzError;
use retailpos_core::DomainError;
use retailpos_infra::StoreError;

/// Everything a handler can fail with.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("missing or invalid CSRF token")]
    Csrf,

    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Domain(err) => domain_error_to_response(err),
            ServiceError::Store(err) => match err {
                StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
                StoreError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
                other => {
                    error!(error = %other, "storage failure");
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
                }
            },
            ServiceError::Forbidden(err) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
            ServiceError::Unauthenticated => {
                json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required")
            }
            ServiceError::InvalidCredentials => json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "invalid email or password",
            ),
            ServiceError::Csrf => json_error(StatusCode::FORBIDDEN, "csrf_failed", "missing or invalid CSRF token"),
            ServiceError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        }
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
