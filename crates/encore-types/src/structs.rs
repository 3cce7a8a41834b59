//! Core entity structs for the Encore auction service.
//!
//! Persisted entities (`Round`, `Item`, `Bid`, `Refund`), the derived
//! leaderboard views, and the resolved-identity boundary type. Derived
//! views are never stored -- they must always be recomputable from the
//! persisted bid set alone.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Role, RoundStatus};
use crate::ids::{BidId, ItemId, PartyId, RefundId, RoundId};

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// One timed auction round owned by a host.
///
/// The deadline (`ends_at`) is fixed at creation and never extended.
/// Once `status` is [`RoundStatus::Closed`] the record is immutable except
/// for `winner`, which is set exactly once by the close transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Round {
    /// Round identifier.
    pub id: RoundId,
    /// The host that opened the round.
    pub host: PartyId,
    /// Lifecycle status.
    pub status: RoundStatus,
    /// Configured duration in seconds.
    pub duration_seconds: u32,
    /// When the round opened.
    pub started_at: DateTime<Utc>,
    /// Nominal deadline: `started_at + duration_seconds`. Never extended.
    pub ends_at: DateTime<Utc>,
    /// The winning item, set exactly once at close. `None` while active,
    /// and `None` after close if the round had no bids or was superseded.
    pub winner: Option<ItemId>,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Round {
    /// Open a new active round for `host` with a deadline of
    /// `now + duration_seconds`.
    ///
    /// The deadline saturates at the maximum representable timestamp
    /// rather than overflowing.
    pub fn open(host: PartyId, duration_seconds: u32, now: DateTime<Utc>) -> Self {
        let ends_at = now
            .checked_add_signed(chrono::Duration::seconds(i64::from(duration_seconds)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: RoundId::new(),
            host,
            status: RoundStatus::Active,
            duration_seconds,
            started_at: now,
            ends_at,
            winner: None,
            created_at: now,
        }
    }

    /// Whether the round is currently accepting bids.
    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }

    /// Whether the nominal deadline has passed at `now`.
    ///
    /// Used as defense in depth by the bid processor -- the deadline timer
    /// should already have closed an expired round.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A catalog item bidders compete over within a round.
///
/// The catalog collaborator owns the item lifecycle; the core only reads
/// items to validate "item belongs to the round's host" and for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Item {
    /// Item identifier.
    pub id: ItemId,
    /// The host that owns this item.
    pub host: PartyId,
    /// Display title.
    pub title: String,
    /// Display artist.
    pub artist: String,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Create a new catalog item owned by `host`.
    pub fn new(host: PartyId, title: String, artist: String, now: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::new(),
            host,
            title,
            artist,
            created_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Bid
// ---------------------------------------------------------------------------

/// A bidder's stake on one item within one round.
///
/// One logical record per (round, item, bidder). A resubmission raises the
/// recorded amount in place -- the amount is monotonically increasing over
/// the record's history and the record is never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bid {
    /// Bid record identifier (stable across raises).
    pub id: BidId,
    /// The round the bid belongs to.
    pub round: RoundId,
    /// The item the bid is on.
    pub item: ItemId,
    /// The bidding party.
    pub bidder: PartyId,
    /// Current amount. Positive; strictly greater than any prior amount
    /// this bidder recorded on this item in this round.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// When the first submission was recorded.
    pub created_at: DateTime<Utc>,
    /// When the amount was last raised.
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    /// Record a first-time bid.
    pub fn place(
        round: RoundId,
        item: ItemId,
        bidder: PartyId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BidId::new(),
            round,
            item,
            bidder,
            amount,
            created_at: now,
            updated_at: now,
        }
    }

    /// Raise the recorded amount in place.
    ///
    /// Callers must have already validated `amount > self.amount`; this
    /// method only applies the update.
    pub fn raise(&mut self, amount: Decimal, now: DateTime<Utc>) {
        self.amount = amount;
        self.updated_at = now;
    }
}

// ---------------------------------------------------------------------------
// Refund
// ---------------------------------------------------------------------------

/// A recorded obligation to return a losing bid's amount to its bidder.
///
/// Created once at round close for every bid whose item did not win (or
/// for all bids when no item won). Never mutated; this is an obligation,
/// not an executed money movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Refund {
    /// Refund identifier.
    pub id: RefundId,
    /// The round the losing bid was placed in.
    pub round: RoundId,
    /// The item the losing bid was on.
    pub item: ItemId,
    /// The bidder owed the refund.
    pub bidder: PartyId,
    /// The exact recorded amount of the losing bid.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// When the obligation was recorded.
    pub created_at: DateTime<Utc>,
}

impl Refund {
    /// Derive the refund obligation for a losing bid.
    pub fn for_bid(bid: &Bid, now: DateTime<Utc>) -> Self {
        Self {
            id: RefundId::new(),
            round: bid.round,
            item: bid.item,
            bidder: bid.bidder,
            amount: bid.amount,
            created_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived leaderboard views
// ---------------------------------------------------------------------------

/// Per-item aggregate within a round: total staked and distinct bidders.
///
/// Derived, never persisted. The aggregator recomputes entries from the
/// bid set on every accepted bid, so a crash-restarted process reproduces
/// exactly the leaderboard that was last broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LeaderboardEntry {
    /// The item.
    pub item_id: ItemId,
    /// Item display title.
    pub title: String,
    /// Item display artist.
    pub artist: String,
    /// Sum of all bid amounts on this item (zero if none).
    #[ts(as = "String")]
    pub total: Decimal,
    /// Count of distinct bidders with a bid on this item.
    pub bidders: u32,
}

impl LeaderboardEntry {
    /// A zeroed entry for an item with no bids yet.
    pub fn zeroed(item: &Item) -> Self {
        Self {
            item_id: item.id,
            title: item.title.clone(),
            artist: item.artist.clone(),
            total: Decimal::ZERO,
            bidders: 0,
        }
    }
}

/// Summary of the bid that triggered a leaderboard update, for client-side
/// highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LastBid {
    /// The item that was bid on.
    pub item_id: ItemId,
    /// Display name of the bidder (from the resolved identity).
    pub bidder_name: String,
    /// The accepted amount.
    #[ts(as = "String")]
    pub amount: Decimal,
}

/// The winning item of a closed round together with its final total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Winner {
    /// The winning item.
    pub item_id: ItemId,
    /// Item display title.
    pub title: String,
    /// Item display artist.
    pub artist: String,
    /// The winning total (sum of all bids on the item).
    #[ts(as = "String")]
    pub total: Decimal,
}

/// Full current-state snapshot served to a newly connected or
/// reconnecting party.
///
/// `server_time` lets clients compute an accurate countdown without
/// trusting their own clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Snapshot {
    /// The active round.
    pub round: Round,
    /// The current leaderboard, total-descending.
    pub items: Vec<LeaderboardEntry>,
    /// Server wall-clock time at snapshot computation.
    pub server_time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Refund pull-query views
// ---------------------------------------------------------------------------

/// One refund obligation enriched with the item title for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RefundLine {
    /// Refund identifier.
    pub id: RefundId,
    /// The round the refund belongs to.
    pub round_id: RoundId,
    /// The item the losing bid was on.
    pub item_id: ItemId,
    /// Item display title (empty if the item left the catalog).
    pub item_title: String,
    /// Refunded amount.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// When the obligation was recorded.
    pub created_at: DateTime<Utc>,
}

/// A bidder's refund history plus the aggregate total.
///
/// This is the durable, pull-style counterpart to the lossy
/// [`RefundNotice`](crate::events::RefundNotice) push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RefundSummary {
    /// Individual refund records, most recent first.
    pub refunds: Vec<RefundLine>,
    /// Sum of all listed refund amounts.
    #[ts(as = "String")]
    pub total_refunded: Decimal,
}

// ---------------------------------------------------------------------------
// Identity boundary
// ---------------------------------------------------------------------------

/// A resolved identity attached to every inbound call.
///
/// Produced by the identity collaborator upstream (login, session
/// tokens); the core trusts this resolution and performs no
/// authentication itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Identity {
    /// The resolved party.
    pub party: PartyId,
    /// The role the party acts under.
    pub role: Role,
    /// Human-readable display name.
    pub display_name: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn round_deadline_is_start_plus_duration() {
        let now = Utc::now();
        let round = Round::open(PartyId::new(), 60, now);
        assert_eq!(round.status, RoundStatus::Active);
        assert_eq!(round.started_at, now);
        assert_eq!(round.ends_at, now + chrono::Duration::seconds(60));
        assert!(round.winner.is_none());
    }

    #[test]
    fn round_expiry_is_inclusive_of_deadline() {
        let now = Utc::now();
        let round = Round::open(PartyId::new(), 30, now);
        assert!(!round.is_expired(now));
        assert!(round.is_expired(round.ends_at));
        assert!(round.is_expired(round.ends_at + chrono::Duration::seconds(1)));
    }

    #[test]
    fn bid_raise_keeps_identity_and_creation_time() {
        let now = Utc::now();
        let mut bid = Bid::place(
            RoundId::new(),
            ItemId::new(),
            PartyId::new(),
            Decimal::from(50),
            now,
        );
        let id = bid.id;
        let later = now + chrono::Duration::seconds(5);
        bid.raise(Decimal::from(120), later);
        assert_eq!(bid.id, id);
        assert_eq!(bid.created_at, now);
        assert_eq!(bid.updated_at, later);
        assert_eq!(bid.amount, Decimal::from(120));
    }

    #[test]
    fn refund_copies_the_losing_bid_exactly() {
        let now = Utc::now();
        let bid = Bid::place(
            RoundId::new(),
            ItemId::new(),
            PartyId::new(),
            Decimal::from(150),
            now,
        );
        let refund = Refund::for_bid(&bid, now);
        assert_eq!(refund.round, bid.round);
        assert_eq!(refund.item, bid.item);
        assert_eq!(refund.bidder, bid.bidder);
        assert_eq!(refund.amount, bid.amount);
    }

    #[test]
    fn zeroed_entry_has_no_total_and_no_bidders() {
        let item = Item::new(
            PartyId::new(),
            "Midnight City".to_owned(),
            "M83".to_owned(),
            Utc::now(),
        );
        let entry = LeaderboardEntry::zeroed(&item);
        assert_eq!(entry.item_id, item.id);
        assert_eq!(entry.total, Decimal::ZERO);
        assert_eq!(entry.bidders, 0);
    }
}
