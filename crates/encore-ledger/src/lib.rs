//! Ledger storage boundary for the Encore auction service.
//!
//! The [`Ledger`] trait is the single source of truth for rounds, bids,
//! and refund obligations. It is pure data access -- validation and
//! lifecycle policy live in the engine. The one concession to
//! concurrency is [`Ledger::close_round`], a conditional-update
//! primitive the engine's close-once guarantee is built on.
//!
//! Two implementations exist:
//!
//! - [`MemoryLedger`] (this crate) -- a `RwLock`-protected in-memory
//!   store, the default backend and the substrate for engine tests.
//! - `PgLedger` (`encore-db`) -- durable `PostgreSQL` storage.

pub mod error;
pub mod memory;
pub mod store;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use store::{BidUpsert, CloseTransition, Ledger};
