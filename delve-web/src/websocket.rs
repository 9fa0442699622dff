//! WebSocket handler for streaming research progress
//!
//! Progress events produced by the research engine are forwarded verbatim
//! as JSON text frames. The stream is broadcast, so every connected client
//! sees every event regardless of who started the run.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Research progress WebSocket handler
pub async fn progress_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_progress_socket(socket, state))
}

/// Handle a progress WebSocket connection
async fn handle_progress_socket(mut socket: WebSocket, state: AppState) {
    info!("New progress WebSocket connection established");

    // Subscribe to progress updates
    let mut progress_receiver = state.subscribe_to_progress();

    loop {
        tokio::select! {
            // Receive progress events from the broadcaster
            event_result = progress_receiver.recv() => {
                match event_result {
                    Ok(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(e) => {
                                error!("Failed to serialize progress event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            info!("Client disconnected during update");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("WebSocket client lagged behind, skipped {} events", skipped);
                        // Continue receiving
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Progress broadcaster closed");
                        break;
                    }
                }
            }
            // Handle incoming WebSocket messages
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Progress WebSocket connection closed by client");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("Progress WebSocket error: {}", e);
                        break;
                    }
                    _ => {
                        // Ignore other message types
                    }
                }
            }
        }
    }

    info!("Progress WebSocket connection terminated");
}
