//! Round/bid coordination engine for the Encore auction service.
//!
//! This crate owns the auction semantics: the round lifecycle state
//! machine with its race-free close-once transition, concurrent bid
//! acceptance with the increasing-bid invariant, pure leaderboard
//! aggregation, winner determination, refund-set computation, and the
//! broadcast fan-out that keeps every connected party's view consistent.
//!
//! The engine is linearizable per round identity: a per-round async
//! mutex serializes bid acceptance and close for one round without
//! blocking other rounds, and the ledger's conditional-update primitive
//! is the authoritative close-once guard underneath it.
//!
//! # Modules
//!
//! - [`rounds`] -- the [`AuctionEngine`]: open, close, supersede, timers
//! - [`bids`] -- bid validation and acceptance (impl on the engine)
//! - [`leaderboard`] -- the pure aggregator
//! - [`broadcast`] -- event fan-out and the refund-notice registry
//! - [`catalog`] -- the read boundary to the item catalog collaborator
//! - [`error`] -- the engine error taxonomy

pub mod broadcast;
pub mod catalog;
pub mod error;
pub mod leaderboard;
pub mod rounds;

mod bids;

pub use broadcast::{Broadcaster, ConnectionId};
pub use catalog::{Catalog, CatalogError, MemoryCatalog};
pub use error::EngineError;
pub use rounds::{AuctionEngine, CloseInitiator};
