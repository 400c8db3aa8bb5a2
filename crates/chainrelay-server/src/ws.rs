//! axum router and WebSocket session loop.
//!
//! `GET /api` is a liveness endpoint, `GET /` upgrades to a WebSocket that
//! becomes one broadcast client, and everything else falls through to
//! static files. Inbound client messages are ignored (pings answered);
//! disconnect removes the client from the registry.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::broadcast::{ClientId, ClientRegistry};

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    pub clients: Arc<ClientRegistry>,
    pub static_dir: PathBuf,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/api", get(api))
        .route("/", get(upgrade))
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn api() -> impl IntoResponse {
    Json(serde_json::json!({}))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.clients))
}

/// One connected client: drain the broadcast queue into the socket while
/// ignoring whatever the client sends.
async fn handle_socket(socket: WebSocket, clients: Arc<ClientRegistry>) {
    let (id, mut frames) = clients.add_client();
    info!(client_id = id, count = clients.client_count(), "client connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // client messages are not used
                Some(Err(e)) => {
                    debug!(client_id = id, error = %e, "socket error");
                    break;
                }
            },
        }
    }

    remove(&clients, id);
}

fn remove(clients: &ClientRegistry, id: ClientId) {
    clients.remove_client(id);
    info!(client_id = id, count = clients.client_count(), "client disconnected");
}
