//! Minimal `/healthz`, `/readyz`, and (behind the `metrics` feature)
//! `/metrics` HTTP surface, built on `axum` the way `storage/src/health.rs`
//! runs its own health check server.

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use owo_colors::OwoColorize;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(feature = "metrics")]
async fn metrics() -> impl IntoResponse {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    match encoder.encode(&metric_families, &mut buf) {
        Ok(()) => (StatusCode::OK, buf).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Serves the health/metrics endpoints until `shutdown` is cancelled.
pub async fn serve(addr: SocketAddr, shutdown: CancellationToken) -> std::io::Result<()> {
    let app = Router::new().route("/healthz", get(healthz)).route("/readyz", get(healthz));
    #[cfg(feature = "metrics")]
    let app = app.route("/metrics", get(metrics));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("{}", format!("❤️  Health server listening on {addr}").green());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
