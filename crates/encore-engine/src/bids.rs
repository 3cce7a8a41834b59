//! Bid validation and acceptance.
//!
//! A bid submission is validated against the active round and the
//! bidder's own recorded stake, then committed and broadcast while the
//! round's mutex is held -- the upsert, the leaderboard recomputation,
//! and the `leaderboard_updated` broadcast are atomic with respect to
//! every other bid and to the close path. Broadcast order therefore
//! equals ledger commit order, and a `round_closed` event can never
//! overtake the last `leaderboard_updated` that preceded the close
//! decision.

use chrono::Utc;
use encore_ledger::BidUpsert;
use encore_types::{
    AuctionEvent, ItemId, LastBid, LeaderboardEntry, LeaderboardUpdated, PartyId, RoundId,
};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::EngineError;
use crate::leaderboard;
use crate::rounds::AuctionEngine;

impl AuctionEngine {
    /// Place or raise a bid on `item_id` in the active round.
    ///
    /// A resubmission must exceed the bidder's recorded stake on the
    /// item (not the item's leaderboard total) and adds to that stake.
    /// Returns the recomputed leaderboard on success.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoActiveRound`] -- no round is active, or
    ///   `round_id` is not the active round.
    /// - [`EngineError::RoundExpired`] -- the deadline has passed.
    /// - [`EngineError::InvalidAmount`] -- `amount` is not positive.
    /// - [`EngineError::ItemNotInRound`] -- the item is not in the
    ///   round host's catalog.
    /// - [`EngineError::BidTooLow`] -- the submission does not exceed
    ///   the bidder's recorded stake.
    pub async fn place_bid(
        &self,
        round_id: RoundId,
        item_id: ItemId,
        bidder: PartyId,
        bidder_name: &str,
        amount: Decimal,
    ) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let active = self
            .ledger()
            .active_round()
            .await?
            .ok_or(EngineError::NoActiveRound)?;
        if active.id != round_id {
            return Err(EngineError::NoActiveRound);
        }

        let lock = self.round_lock(round_id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock: the round may have closed while we
        // waited behind another bidder or a closer.
        let round = self
            .ledger()
            .round(round_id)
            .await?
            .ok_or(EngineError::NoActiveRound)?;
        if !round.is_active() {
            return Err(EngineError::NoActiveRound);
        }

        let now = Utc::now();
        if round.is_expired(now) {
            // Defense in depth: the deadline timer should have closed
            // this round already.
            return Err(EngineError::RoundExpired);
        }

        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount);
        }

        let item = self
            .catalog()
            .item(item_id)
            .await?
            .filter(|item| item.host == round.host)
            .ok_or(EngineError::ItemNotInRound(item_id))?;

        let prior = self.ledger().bid_for(round_id, item_id, bidder).await?;
        let stake = match prior {
            Some(ref existing) => {
                if amount <= existing.amount {
                    return Err(EngineError::BidTooLow {
                        current: existing.amount,
                    });
                }
                // The raise joins the bidder's existing stake on the
                // item; the record accumulates.
                existing.amount.checked_add(amount).unwrap_or(Decimal::MAX)
            }
            None => amount,
        };

        self.ledger()
            .upsert_bid(BidUpsert {
                round: round_id,
                item: item_id,
                bidder,
                amount: stake,
                now,
            })
            .await?;

        let items = self.catalog().items_for_host(round.host).await?;
        let bids = self.ledger().bids_for_round(round_id).await?;
        let entries = leaderboard::compute(&items, &bids);

        debug!(
            round_id = %round_id,
            item = %item.title,
            bidder = %bidder,
            %amount,
            %stake,
            "bid accepted"
        );

        self.broadcaster()
            .broadcast(AuctionEvent::LeaderboardUpdated(LeaderboardUpdated {
                round_id,
                items: entries.clone(),
                last_bid: LastBid {
                    item_id,
                    bidder_name: bidder_name.to_owned(),
                    amount,
                },
            }));

        Ok(entries)
    }
}
