//! Axum router construction for the auction API.
//!
//! Assembles all routes (REST + WebSocket) into a single [`Router`]
//! with CORS and request tracing enabled, matching what the dashboard
//! frontend expects during development.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the auction server.
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_auction))
        // Rounds
        .route("/api/rounds", post(handlers::open_round))
        .route("/api/rounds/active", get(handlers::active_round))
        .route("/api/rounds/history", get(handlers::round_history))
        .route("/api/rounds/{id}/close", post(handlers::close_round))
        .route("/api/rounds/{id}/bids", get(handlers::round_bids))
        // Bids
        .route("/api/bids", post(handlers::place_bid))
        .route("/api/bids/mine", get(handlers::my_bids))
        // Refunds
        .route("/api/refunds/mine", get(handlers::my_refunds))
        // Catalog boundary
        .route("/api/items", post(handlers::add_item).get(handlers::list_items))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
