use axum::{response::IntoResponse, Json};
use serde_json::json;

/// `GET /health`: liveness check.
///
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
#[tracing::instrument]
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
