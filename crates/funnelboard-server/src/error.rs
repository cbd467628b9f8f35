use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use funnelboard_core::error::CoreError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every body has the shape `{"error": <message>, "data": []}` so a chart
/// bound to `data` renders empty instead of breaking.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Every upstream source the request needed was unavailable.
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        if err.is_request_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.into())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Upstream(msg) => {
                tracing::warn!(reason = %msg, "dashboard request failed upstream");
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message, "data": [] }))).into_response()
    }
}
