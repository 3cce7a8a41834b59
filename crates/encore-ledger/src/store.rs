//! The [`Ledger`] trait: CRUD-style access to rounds, bids, and refunds
//! plus the conditional-update primitive the close-once transition rides
//! on.
//!
//! Backends must make each operation atomic with respect to the others,
//! but cross-operation coordination (e.g. "no bids after close") is the
//! engine's job -- the ledger enforces no policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use encore_types::{Bid, ItemId, PartyId, Refund, Round, RoundId};
use rust_decimal::Decimal;

use crate::error::LedgerError;

/// Outcome of the conditional active-to-closed update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseTransition {
    /// This caller won the transition: the round is now closed and the
    /// winner field was set exactly once.
    Transitioned,
    /// The round was already closed. The caller lost the close race (or
    /// repeated the call) and must not re-run winner/refund logic.
    AlreadyClosed,
}

/// Parameters for recording or raising a bid.
///
/// Packs the upsert arguments into a single struct to keep call sites
/// readable. Validation (positive amount, strictly above the bidder's
/// prior amount) happens in the bid processor before this is built.
#[derive(Debug, Clone)]
pub struct BidUpsert {
    /// The round the bid belongs to.
    pub round: RoundId,
    /// The item the bid is on.
    pub item: ItemId,
    /// The bidding party.
    pub bidder: PartyId,
    /// The new amount.
    pub amount: Decimal,
    /// Submission timestamp.
    pub now: DateTime<Utc>,
}

/// Storage boundary for rounds, bids, and refund obligations.
///
/// The engine treats whatever a `Ledger` holds as the authoritative
/// state; leaderboards are always re-derived from [`bids_for_round`]
/// rather than cached.
///
/// [`bids_for_round`]: Ledger::bids_for_round
#[async_trait]
pub trait Ledger: Send + Sync {
    // -- rounds -------------------------------------------------------

    /// Persist a newly opened round.
    async fn insert_round(&self, round: Round) -> Result<(), LedgerError>;

    /// Fetch a round by ID.
    async fn round(&self, id: RoundId) -> Result<Option<Round>, LedgerError>;

    /// The globally active round, if any (latest start time wins when
    /// several hosts are active at once).
    async fn active_round(&self) -> Result<Option<Round>, LedgerError>;

    /// Force-close every active round owned by `host` without setting a
    /// winner. Returns the IDs of the superseded rounds.
    ///
    /// Used when a host opens a new round while an older one is still
    /// active: the old round is abandoned, not completed, so no winner
    /// and no refunds are computed for it.
    async fn supersede_active(&self, host: PartyId) -> Result<Vec<RoundId>, LedgerError>;

    /// Conditionally transition a round from active to closed, setting
    /// the winner field exactly once.
    ///
    /// This is the close-once primitive: of any number of concurrent
    /// callers exactly one observes [`CloseTransition::Transitioned`].
    ///
    /// # Errors
    ///
    /// [`LedgerError::RoundNotFound`] if the round does not exist.
    async fn close_round(
        &self,
        id: RoundId,
        winner: Option<ItemId>,
    ) -> Result<CloseTransition, LedgerError>;

    /// A host's past rounds, most recent first, bounded by `limit`.
    async fn rounds_for_host(
        &self,
        host: PartyId,
        limit: usize,
    ) -> Result<Vec<Round>, LedgerError>;

    // -- bids ---------------------------------------------------------

    /// Insert a first-time bid or raise the existing record in place.
    ///
    /// The logical record for (round, item, bidder) keeps its ID and
    /// creation timestamp across raises. Returns the stored record.
    async fn upsert_bid(&self, upsert: BidUpsert) -> Result<Bid, LedgerError>;

    /// The bidder's current bid on an item in a round, if any.
    async fn bid_for(
        &self,
        round: RoundId,
        item: ItemId,
        bidder: PartyId,
    ) -> Result<Option<Bid>, LedgerError>;

    /// All bids in a round, in deterministic (item, bidder) order.
    async fn bids_for_round(&self, round: RoundId) -> Result<Vec<Bid>, LedgerError>;

    /// One bidder's bids in a round.
    async fn bids_for_bidder(
        &self,
        round: RoundId,
        bidder: PartyId,
    ) -> Result<Vec<Bid>, LedgerError>;

    // -- refunds ------------------------------------------------------

    /// Append refund obligations. Called exactly once per closed round,
    /// by the close transition's winning caller.
    async fn insert_refunds(&self, refunds: &[Refund]) -> Result<(), LedgerError>;

    /// All refunds recorded for a round.
    async fn refunds_for_round(&self, round: RoundId) -> Result<Vec<Refund>, LedgerError>;

    /// A bidder's refund history, most recent first, bounded by `limit`.
    async fn refunds_for_bidder(
        &self,
        bidder: PartyId,
        limit: usize,
    ) -> Result<Vec<Refund>, LedgerError>;
}
