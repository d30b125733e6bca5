//! Maps core errors to HTTP status codes: schema violation -> 422,
//! not found -> 404, bad query parameter -> 400, store unavailable -> 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use reconcile_core::{RunError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid query parameter: {0}")]
    BadQuery(String),

    #[error("not found")]
    NotFound,

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::SchemaViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::StoreUnavailable(e.to_string())
    }
}

impl From<RunError> for ApiError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::Store(store_err) => store_err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
