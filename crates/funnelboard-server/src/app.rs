use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware, outermost first: `CorsLayer`, `TraceLayer`, `CompressionLayer`.
/// CORS allows any origin unless `FUNNELBOARD_CORS_ORIGINS` lists some.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/dashboard", get(routes::dashboard::dashboard))
        .route("/api/dashboard/data", get(routes::dashboard::raw_points))
        .route("/api/dashboard/summary", get(routes::dashboard::summary))
        .route("/api/dashboard/process", post(routes::process::process))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}
