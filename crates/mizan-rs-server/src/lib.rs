//! HTTP surface for the Mizan memory engine.
//!
//! # Endpoints
//!
//! - `GET /health` - operational snapshot
//! - `POST /memories` - add a memory
//! - `GET /memories` - filtered listing
//! - `GET /memories/search` - hybrid search
//! - `GET /memories/{id}` / `DELETE /memories/{id}`
//! - `POST /memories/summarize` - compaction pass
//! - `POST /memories/decay` - decay and prune pass
//! - `POST /wal/flush` - clear the durability log

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use log::info;
use std::net::SocketAddr;

pub use error::{ErrorResponse, ServerError};
pub use state::AppState;

/// Build the router with every route and the request body cap.
pub fn create_router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/memories",
            get(routes::list_memories).post(routes::add_memory),
        )
        .route("/memories/search", get(routes::search))
        .route("/memories/summarize", post(routes::summarize))
        .route("/memories/decay", post(routes::decay))
        .route(
            "/memories/{id}",
            get(routes::get_memory).delete(routes::delete_memory),
        )
        .route("/wal/flush", post(routes::flush_wal))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    body_limit_bytes: usize,
) -> Result<(), ServerError> {
    let router = create_router(state, body_limit_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("memory server listening (addr={})", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("memory server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler, serve until the process is killed.
        std::future::pending::<()>().await;
    }
}
