//! Shared application state for the auction API server.
//!
//! [`AppState`] wires the engine to its collaborators and is injected
//! into handlers via Axum's `State` extractor. The ledger and catalog
//! are held behind their trait objects so the binary can choose the
//! backend at startup (in-memory or `PostgreSQL`) without the handlers
//! caring.

use std::sync::Arc;

use encore_engine::{AuctionEngine, Broadcaster, Catalog, MemoryCatalog};
use encore_ledger::{Ledger, MemoryLedger};

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// The auction engine.
    pub engine: Arc<AuctionEngine>,
    /// The ledger, for pull-style queries that bypass the engine.
    pub ledger: Arc<dyn Ledger>,
    /// The catalog boundary.
    pub catalog: Arc<dyn Catalog>,
    /// The broadcast hub the WebSocket layer subscribes to.
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    /// Assemble the application state over the given backends.
    pub fn new(ledger: Arc<dyn Ledger>, catalog: Arc<dyn Catalog>) -> Arc<Self> {
        let broadcaster = Arc::new(Broadcaster::new());
        let engine = Arc::new(AuctionEngine::new(
            Arc::clone(&ledger),
            Arc::clone(&catalog),
            Arc::clone(&broadcaster),
        ));
        Arc::new(Self {
            engine,
            ledger,
            catalog,
            broadcaster,
        })
    }

    /// State backed entirely by in-memory stores.
    pub fn in_memory() -> Arc<Self> {
        Self::new(
            Arc::new(MemoryLedger::new()),
            Arc::new(MemoryCatalog::new()),
        )
    }
}
