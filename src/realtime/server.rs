//! WebSocket server for the realtime core

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::router::RealtimeRouter;

/// WebSocket server
pub struct RealtimeServer {
    router: RealtimeRouter,
    addr: SocketAddr,
}

impl RealtimeServer {
    /// Create a new WebSocket server
    pub fn new(router: RealtimeRouter, port: u16) -> Self {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        Self { router, addr }
    }

    /// Build the axum router
    pub fn router(realtime: RealtimeRouter) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(realtime)
    }

    /// Start the server
    pub async fn start(self) -> std::io::Result<()> {
        let app = Self::router(self.router);

        tracing::info!("WebSocket server listening on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Health check endpoint
async fn health_handler(State(router): State<RealtimeRouter>) -> impl IntoResponse {
    serde_json::json!({
        "status": "ok",
        "clients": router.registry().client_count(),
        "activeUsers": router.registry().active_users().len(),
    })
    .to_string()
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(router): State<RealtimeRouter>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, router))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, router: RealtimeRouter) {
    let conn_id = Uuid::new_v4().to_string();

    let (tx, mut rx) = mpsc::unbounded_channel();
    router.registry().register(conn_id.clone(), tx);
    tracing::info!("Client connected: {}", conn_id);

    let (mut sender, mut receiver) = socket.split();

    // Task to forward outbound events to the client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Inbound events are handled one at a time per connection: the loop
    // awaits each handler before reading the next frame
    let recv_router = router.clone();
    let recv_conn = conn_id.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = recv_router.handle_frame(&recv_conn, &text).await {
                        // Event dropped; the connection stays joined and
                        // the client may retry
                        tracing::warn!("Dropped event from {}: {}", recv_conn, e);
                    }
                }
                Message::Close(_) => {
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either direction to finish
    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }

    router.handle_disconnect(&conn_id);
    tracing::info!("Client disconnected: {}", conn_id);
}
