use std::str::FromStr;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use retailpos_core::DomainError;

use crate::app::errors::ServiceError;

pub type ApiResult<T> = Result<T, ServiceError>;

/// Parse a path segment into a typed id (`400 invalid_id` on failure).
pub fn parse_id<T>(raw: &str) -> ApiResult<T>
where
    T: FromStr<Err = DomainError>,
{
    Ok(raw.parse::<T>()?)
}

pub fn created<T: Serialize>(body: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(body))
}
