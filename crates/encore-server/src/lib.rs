//! Auction API server for the Encore auction service.
//!
//! Exposes the engine over HTTP (Axum REST endpoints) and a WebSocket
//! event stream. The identity collaborator resolves callers upstream;
//! this crate only reads the resolved identity headers and enforces
//! role scoping. All auction semantics live in `encore-engine` -- the
//! server is routing, validation, and delivery.
//!
//! # Modules
//!
//! - [`config`] -- environment-variable configuration
//! - [`state`] -- shared application state
//! - [`identity`] -- the resolved-identity extractor
//! - [`handlers`] -- REST endpoint handlers
//! - [`ws`] -- the WebSocket session (snapshot-first, then events)
//! - [`router`] -- route assembly
//! - [`server`] -- server lifecycle
//! - [`error`] -- HTTP error mapping

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::build_router;
pub use server::start_server;
pub use state::AppState;
