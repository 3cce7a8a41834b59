//! Error taxonomy for the auction engine.
//!
//! Validation failures are reported synchronously to the caller and
//! never retried by the engine; the caller must resubmit with corrected
//! input. A lost close race is deliberately *not* an error -- it
//! resolves to the winning attempt's result. Storage failures pass
//! through as [`EngineError::Ledger`] and are transient from the
//! caller's perspective.

use encore_ledger::LedgerError;
use encore_types::{ItemId, RoundId};
use rust_decimal::Decimal;

use crate::catalog::CatalogError;

/// Errors that can occur while operating the auction engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The host has no catalog items, so there is nothing to bid on.
    #[error("add at least one item before opening a round")]
    NoItems,

    /// A round cannot run for zero seconds.
    #[error("round duration must be at least one second")]
    InvalidDuration,

    /// There is no active round, or the referenced round is not the
    /// active one.
    #[error("no active bidding round right now")]
    NoActiveRound,

    /// The round's deadline has passed. The deadline timer should have
    /// closed the round already; this is the bid processor's own check.
    #[error("bidding round has ended")]
    RoundExpired,

    /// Bid amounts must be positive.
    #[error("bid amount must be positive")]
    InvalidAmount,

    /// The item does not belong to the active round's host catalog.
    #[error("item {0} is not part of the current round")]
    ItemNotInRound(ItemId),

    /// The submission does not exceed the bidder's recorded stake on
    /// this item.
    #[error("new bid must be higher than your current bid of {current}")]
    BidTooLow {
        /// The bidder's currently recorded stake on the item.
        current: Decimal,
    },

    /// The referenced round does not exist (or is not visible to the
    /// initiator).
    #[error("round not found: {0}")]
    RoundNotFound(RoundId),

    /// The ledger failed; committed state is whatever it last held.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The catalog collaborator failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
