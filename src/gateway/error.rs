//! Error envelope
//!
//! Every failure a client can see is one of these, rendered as HTTP 500 with
//! `{"error": <message>}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::response::ErrorResponse;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Any failed operation; carries the underlying message
    #[error("{0}")]
    OperationFailed(String),

    /// Connectivity probe failure; the cause is logged, not returned
    #[error("Cannot connect to database")]
    ConnectionFailed,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::Database(_) | StoreError::Closed => {
                tracing::error!(error = %err, "store operation failed")
            }
            _ => tracing::warn!(error = %err, "store operation rejected"),
        }
        ApiError::OperationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!(error = %err, "response serialization failed");
        ApiError::OperationFailed(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
