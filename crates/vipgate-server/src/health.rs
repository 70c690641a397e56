//! Liveness endpoint for hosting platforms.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Clone)]
struct HealthState {
    started: Instant,
}

/// Build the health router: `GET /` and `GET /health`.
pub fn health_routes() -> Router {
    let state = HealthState {
        started: Instant::now(),
    };
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .with_state(state)
}

async fn handle_root() -> &'static str {
    "vipgate is running"
}

async fn handle_health(State(state): State<HealthState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": vipgate_core::VERSION,
        "uptime_secs": state.started.elapsed().as_secs(),
    }))
}

/// Bind the health listener.
pub async fn bind(listen: &str) -> std::io::Result<TcpListener> {
    TcpListener::bind(listen).await
}

/// Serve the health router on an already bound listener until shutdown.
pub async fn serve(listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    info!(addr = ?addr, "health endpoint listening");
    axum::serve(listener, health_routes())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_root_and_health() {
        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, shutdown.clone()));

        let client = reqwest::Client::new();
        let root = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .unwrap();
        assert!(root.status().is_success());
        assert_eq!(root.text().await.unwrap(), "vipgate is running");

        let health: serde_json::Value = client
            .get(format!("http://{addr}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["version"], vipgate_core::VERSION);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }
}
