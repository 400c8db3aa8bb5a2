//! # chainrelay-server
//!
//! The thin web surface of ChainRelay: an axum application serving the
//! liveness endpoint, the WebSocket upgrade, and static files, plus the
//! broadcast client registry and the notifier sink that feeds it.
//!
//! No sessions, no auth: a connected socket is a broadcast client for its
//! lifetime, nothing more.

pub mod broadcast;
pub mod sink;
pub mod ws;

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::info;

pub use broadcast::{ClientId, ClientRegistry};
pub use sink::{register_broadcast, BroadcastSink};
pub use ws::{router, AppState};

/// Bind and serve the web surface until cancellation.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
