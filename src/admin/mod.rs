//! Status server exposing lifecycle state and boot timings.
//!
//! # Routes
//! - `GET /status`: state, gates, readiness (503 until ready without error)
//! - `GET /timings`: recorded timing intervals in start order

pub mod handlers;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::lifecycle::{Lifecycle, Shutdown};

use self::handlers::*;

pub fn setup_admin_router(lifecycle: Lifecycle) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/timings", get(get_timings))
        .layer(TraceLayer::new_for_http())
        .with_state(lifecycle)
}

/// Serve the status router until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    lifecycle: Lifecycle,
    shutdown: Shutdown,
) -> std::io::Result<()> {
    let router = setup_admin_router(lifecycle);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!("Status server stopped");
    Ok(())
}
