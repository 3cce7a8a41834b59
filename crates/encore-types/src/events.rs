//! Wire events pushed to connected parties.
//!
//! Three broadcast event kinds fan out to every connected party
//! (`round_opened`, `leaderboard_updated`, `round_closed`) and one
//! unicast kind (`refund_notice`) goes only to bidders with at least one
//! refundable bid. [`ServerMessage`] is the tagged envelope actually
//! written to the WebSocket; it additionally carries the
//! connection-time snapshot (`current_state` / `no_active_round`).
//!
//! Delivery is best-effort: a party that is disconnected or lagging
//! simply misses events. Durable state stays authoritative in the ledger
//! and is retrievable through the pull-style queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::RoundId;
use crate::structs::{LastBid, LeaderboardEntry, Snapshot, Winner};

// ---------------------------------------------------------------------------
// Broadcast payloads
// ---------------------------------------------------------------------------

/// A new round has opened. Carries the zeroed leaderboard so clients can
/// render every item immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RoundOpened {
    /// The new round.
    pub round_id: RoundId,
    /// Display name of the host that opened it.
    pub host_name: String,
    /// Configured duration in seconds.
    pub duration_seconds: u32,
    /// The fixed deadline (never extended).
    pub deadline: DateTime<Utc>,
    /// All catalog items with zero totals and zero bidder counts.
    pub items: Vec<LeaderboardEntry>,
}

/// A bid was accepted; the full recomputed leaderboard plus the
/// triggering bid for highlighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LeaderboardUpdated {
    /// The round the bid landed in.
    pub round_id: RoundId,
    /// The recomputed leaderboard, total-descending.
    pub items: Vec<LeaderboardEntry>,
    /// The bid that triggered this update.
    pub last_bid: LastBid,
}

/// The round closed. Sent exactly once per round regardless of how many
/// concurrent triggers raced to close it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RoundClosed {
    /// The closed round.
    pub round_id: RoundId,
    /// The winning item, or `None` when the round had no bids.
    pub winner: Option<Winner>,
    /// The final leaderboard.
    pub items: Vec<LeaderboardEntry>,
}

/// Personalized refund notice, unicast to one bidder.
///
/// Aggregates all of the bidder's refundable bids in the round into one
/// message: the combined amount and the titles of the items bid on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RefundNotice {
    /// The round the refunds belong to.
    pub round_id: RoundId,
    /// Combined refund amount across the bidder's losing bids.
    #[ts(as = "String")]
    pub total_amount: Decimal,
    /// Titles of the items the losing bids were on.
    pub item_titles: Vec<String>,
}

// ---------------------------------------------------------------------------
// In-process broadcast event
// ---------------------------------------------------------------------------

/// A state-changing event fanned out to every connected party.
///
/// This is what travels on the in-process broadcast channel; the
/// WebSocket layer wraps it into a [`ServerMessage`] for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionEvent {
    /// A round opened.
    RoundOpened(RoundOpened),
    /// A bid was accepted and the leaderboard changed.
    LeaderboardUpdated(LeaderboardUpdated),
    /// A round closed.
    RoundClosed(RoundClosed),
}

impl AuctionEvent {
    /// The round this event concerns.
    pub const fn round_id(&self) -> RoundId {
        match self {
            Self::RoundOpened(e) => e.round_id,
            Self::LeaderboardUpdated(e) => e.round_id,
            Self::RoundClosed(e) => e.round_id,
        }
    }
}

// ---------------------------------------------------------------------------
// WebSocket envelope
// ---------------------------------------------------------------------------

/// Tagged message envelope written to a WebSocket client.
///
/// The first message a client receives after connecting is always
/// `current_state` or `no_active_round` -- the snapshot is delivered
/// before any incremental event so clients joining mid-round never miss
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full snapshot of the active round.
    CurrentState(Snapshot),
    /// Explicit signal that no round is active.
    NoActiveRound,
    /// A round opened.
    RoundOpened(RoundOpened),
    /// The leaderboard changed.
    LeaderboardUpdated(LeaderboardUpdated),
    /// A round closed.
    RoundClosed(RoundClosed),
    /// A personalized refund notice (unicast only).
    RefundNotice(RefundNotice),
}

impl From<AuctionEvent> for ServerMessage {
    fn from(event: AuctionEvent) -> Self {
        match event {
            AuctionEvent::RoundOpened(e) => Self::RoundOpened(e),
            AuctionEvent::LeaderboardUpdated(e) => Self::LeaderboardUpdated(e),
            AuctionEvent::RoundClosed(e) => Self::RoundClosed(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_internally_tagged() {
        let msg = ServerMessage::NoActiveRound;
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "no_active_round");
    }

    #[test]
    fn round_closed_serializes_null_winner() {
        let msg = ServerMessage::RoundClosed(RoundClosed {
            round_id: RoundId::new(),
            winner: None,
            items: Vec::new(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "round_closed");
        assert!(json["winner"].is_null());
    }

    #[test]
    fn event_envelope_conversion_preserves_round() {
        let payload = RoundClosed {
            round_id: RoundId::new(),
            winner: None,
            items: Vec::new(),
        };
        let event = AuctionEvent::RoundClosed(payload.clone());
        assert_eq!(event.round_id(), payload.round_id);
        let msg = ServerMessage::from(event);
        assert_eq!(msg, ServerMessage::RoundClosed(payload));
    }
}
