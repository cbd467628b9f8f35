use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use funnelboard_server::state::AppState;
use funnelboard_upstream::BackendClient;

/// `funnelboard health`: liveness probe for container health checks.
///
/// Calls `GET http://localhost:$FUNNELBOARD_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("FUNNELBOARD_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{port}/health");
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("funnelboard=info".parse()?),
        )
        .json()
        .init();

    let cfg = funnelboard_server::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let client = BackendClient::from_config(&cfg)?;
    info!(
        api_url = %cfg.api_url,
        timeout_ms = cfg.fetch_timeout_ms,
        retries = cfg.fetch_retries,
        zone = %cfg.zone,
        "backend client ready"
    );

    let state = Arc::new(AppState::new(Arc::new(client), cfg.clone()));
    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = funnelboard_server::app::build_app(state);

    info!(port = cfg.port, "funnelboard listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
