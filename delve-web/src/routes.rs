//! Route definitions for the Delve web server
//!
//! This module defines all the routes for the web application.

use crate::{handlers, websocket, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Research endpoints
        .route("/research/prepare", post(handlers::prepare_research))
        .route("/research/start", post(handlers::start_research))
}

/// Create WebSocket routes
pub fn websocket_routes() -> Router<AppState> {
    Router::new()
        // Research progress stream
        .route("/progress", get(websocket::progress_handler))
}
