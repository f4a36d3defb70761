//! `lineage serve` -- reference simulation backend over HTTP.
//!
//! Serves the in-memory trade pipeline with `axum` + `tokio`.
//!
//! Endpoints:
//! - GET /health                                   - Server status
//! - GET /transaction/steps                        - Ordered pipeline steps
//! - GET /transaction/init                         - Create a transaction
//! - GET /transaction/{id}/process?step_index={i}  - Leave step `i`
//! - GET /transaction/{id}/reset                   - Back to step 0
//!
//! CORS is permissive so a browser front end on another port can call it.
//! Errors are JSON bodies of the form `{"error": "..."}`.

mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware as axum_middleware, Json, Router};
use lineage_service::SimulationService;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use self::handlers::{
    handle_health, handle_init, handle_not_found, handle_process, handle_reset, handle_steps,
};
use self::middleware::{log_requests, rate_limit_middleware};
use self::state::{AppState, RateLimiter};

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

pub(crate) fn router(service: Arc<dyn SimulationService>, rate_limit: u64) -> Router {
    let state = Arc::new(AppState {
        service,
        rate_limiter: RateLimiter::new(rate_limit),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/transaction/steps", get(handle_steps))
        .route("/transaction/init", get(handle_init))
        .route("/transaction/{id}/process", get(handle_process))
        .route("/transaction/{id}/reset", get(handle_reset))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn(log_requests))
        .layer(cors)
        .with_state(state)
}

pub(crate) async fn start_server(
    port: u16,
    rate_limit: u64,
    service: Arc<dyn SimulationService>,
) -> Result<(), std::io::Error> {
    let app = router(service, rate_limit);
    let addr = format!("0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, rate_limit, "lineage backend listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
