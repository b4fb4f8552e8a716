//! HTTP transport: JSON-RPC over `POST /mcp`.
//!
//! # Invariants
//! - Store calls run on the blocking pool, never on runtime workers.
//! - Notifications are acknowledged with `202 Accepted` and an empty body.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use emotions_core::EmotionRepository;
use log::{error, info, warn};

use crate::protocol::{JsonRpcResponse, INTERNAL_ERROR};
use crate::server::EmotionsMcpServer;

/// Serves HTTP on `addr` until ctrl-c.
pub fn serve<R>(server: Arc<EmotionsMcpServer<R>>, addr: SocketAddr) -> io::Result<()>
where
    R: EmotionRepository + Send + Sync + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("event=http_listen module=transport status=ok addr={local_addr}");

        axum::serve(listener, router(server))
            .with_graceful_shutdown(shutdown_signal())
            .await
    })
}

/// Build the router with all routes.
pub fn router<R>(server: Arc<EmotionsMcpServer<R>>) -> Router
where
    R: EmotionRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/mcp", post(mcp_handler::<R>))
        .route("/health", get(health_handler))
        .with_state(server)
}

async fn mcp_handler<R>(State(server): State<Arc<EmotionsMcpServer<R>>>, body: String) -> Response
where
    R: EmotionRepository + Send + Sync + 'static,
{
    match tokio::task::spawn_blocking(move || server.handle_message(&body)).await {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(err) => {
            error!("event=http_request module=transport status=error error={err}");
            let response = JsonRpcResponse::error(None, INTERNAL_ERROR, "request handler failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("event=http_shutdown module=transport status=ok"),
        Err(err) => {
            warn!("event=http_shutdown module=transport status=error error={err}");
            std::future::pending::<()>().await;
        }
    }
}
