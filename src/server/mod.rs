//! Server module - HTTP surface of a running agency
//!
//! Exposes the conversations of an agency over JSON endpoints and streams
//! newly logged messages to SSE subscribers.

pub mod broadcast;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Once;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use broadcast::Broadcaster;
pub use state::AppState;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber (only once)
pub fn init_tracing(debug: bool) {
    TRACING_INIT.call_once(|| {
        let default_filter = if debug {
            "agency=debug,tower_http=info"
        } else {
            "agency=info,tower_http=info"
        };
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}

/// Build the Axum router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(routes::ping))
        .route("/info", get(routes::agency_info))
        .route("/threads", get(routes::list_threads))
        .route("/threads/:id", get(routes::get_thread))
        .route("/threads/:id/messages", get(routes::thread_messages))
        .route("/threads/:id/sseClient", get(routes::thread_events))
        .route("/message", post(routes::post_message))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the agency until the process is stopped
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
