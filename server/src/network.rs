//! HTTP and WebSocket front end.
//!
//! `GET /:world_name` does double duty: a plain request registers the world
//! and serves the browser client, a WebSocket upgrade on the same path joins
//! that world. Each connection gets a reader loop (this task) and a writer
//! task draining its bounded outbound queue.

use crate::client_manager::outbound_queue;
use crate::error::SessionError;
use crate::session::SessionManager;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ProtocolError, ServerMessage};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;

#[derive(Clone)]
struct AppState {
    manager: Arc<SessionManager>,
    static_dir: Arc<PathBuf>,
}

/// Path prefix for static files. The hyphen keeps it out of the world
/// namespace: sanitized world names are `[A-Za-z0-9_]` only, so no world can
/// be shadowed by it.
pub const ASSETS_PATH: &str = "/static-assets";

/// Builds the application router. Static assets are served under
/// [`ASSETS_PATH`].
pub fn router(manager: Arc<SessionManager>, static_dir: PathBuf) -> Router {
    let assets = ServeDir::new(&static_dir);
    let state = AppState {
        manager,
        static_dir: Arc::new(static_dir),
    };

    Router::new()
        .route("/", get(root_handler))
        .route("/:world_name", get(world_handler))
        .nest_service(ASSETS_PATH, assets)
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    manager: Arc<SessionManager>,
    static_dir: PathBuf,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Server listening on {}", addr);
    }
    axum::serve(listener, router(manager, static_dir))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn root_handler(upgrade: Option<WebSocketUpgrade>) -> Response {
    match upgrade {
        Some(ws) => ws.on_upgrade(|socket| reject(socket, SessionError::MissingWorldName)),
        None => (StatusCode::NOT_FOUND, "Pick a world: /<world name>").into_response(),
    }
}

async fn world_handler(
    Path(world_name): Path<String>,
    State(state): State<AppState>,
    upgrade: Option<WebSocketUpgrade>,
) -> Response {
    match upgrade {
        Some(ws) => {
            let manager = Arc::clone(&state.manager);
            ws.on_upgrade(move |socket| handle_socket(socket, manager, world_name))
        }
        None => {
            if state.manager.register_world(&world_name).await.is_none() {
                return (StatusCode::NOT_FOUND, "Invalid world name").into_response();
            }
            serve_client(&state.static_dir).await
        }
    }
}

async fn serve_client(static_dir: &std::path::Path) -> Response {
    let index = static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!("Could not read {}: {}", index.display(), e);
            (StatusCode::NOT_FOUND, "Client not installed").into_response()
        }
    }
}

/// Closes a connection that could not be bound, without creating any state.
async fn reject(socket: WebSocket, reason: SessionError) {
    warn!("Rejecting connection: {}", reason);
    let (mut sender, _) = socket.split();
    close_with(&mut sender, reason).await;
}

async fn close_with(sender: &mut SplitSink<WebSocket, Message>, reason: SessionError) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: reason.to_string().into(),
    };
    if let Err(e) = sender.send(Message::Close(Some(frame))).await {
        debug!("Close frame not delivered: {}", e);
    }
}

async fn handle_socket(socket: WebSocket, manager: Arc<SessionManager>, world_name: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = outbound_queue(manager.config().outbound_buffer);

    let session = match manager.connect(&world_name, tx).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Rejecting connection to {:?}: {}", world_name, e);
            close_with(&mut ws_sender, e).await;
            return;
        }
    };
    let player_id = session.player_id;

    let send_task = tokio::spawn(async move {
        loop {
            let message: ServerMessage = match rx.recv().await {
                Ok(message) => message,
                Err(RecvError::Lagged(missed)) => {
                    warn!(
                        "Outbound queue full for player {}, dropped {} oldest messages",
                        player_id, missed
                    );
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match message.to_json() {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode message for player {}: {}", player_id, e),
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                manager.handle_text(&session, &text).await;
            }
            Ok(Message::Binary(_)) => {
                warn!(
                    "Dropping message from player {}: {}",
                    player_id,
                    ProtocolError::UnsupportedFrame
                );
            }
            Ok(Message::Close(_)) => {
                debug!("Player {} closed the connection", player_id);
                break;
            }
            // Ping/pong replies are handled by axum.
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error for player {}: {}", player_id, e);
                break;
            }
        }
    }

    manager.disconnect(&session).await;
    send_task.abort();
}
