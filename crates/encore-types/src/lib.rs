//! Shared type definitions for the Encore auction service.
//!
//! Every crate in the workspace speaks in terms of these types: strongly
//! typed identifiers, the persisted entities (rounds, items, bids,
//! refunds), the derived leaderboard views, and the wire events pushed to
//! connected clients. Amounts are [`rust_decimal::Decimal`] throughout --
//! no floating point money anywhere in the system.

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

pub use enums::{Role, RoundStatus};
pub use events::{
    AuctionEvent, LeaderboardUpdated, RefundNotice, RoundClosed, RoundOpened, ServerMessage,
};
pub use ids::{BidId, ItemId, PartyId, RefundId, RoundId};
pub use structs::{
    Bid, Identity, Item, LastBid, LeaderboardEntry, Refund, RefundLine, RefundSummary, Round,
    Snapshot, Winner,
};
