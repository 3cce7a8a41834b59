//! In-memory [`Ledger`] implementation.
//!
//! A single `RwLock` over `BTreeMap`s. Each trait method takes the lock
//! once, so every operation is atomic; the maps' ordered keys give the
//! deterministic iteration order the aggregator's re-derivation
//! guarantee depends on. This is the default backend and the substrate
//! the engine test suite runs on; `encore-db` provides the durable
//! equivalent.

use std::collections::BTreeMap;

use async_trait::async_trait;
use encore_types::{Bid, ItemId, PartyId, Refund, Round, RoundId, RoundStatus};
use tokio::sync::RwLock;

use crate::error::LedgerError;
use crate::store::{BidUpsert, CloseTransition, Ledger};

/// Bid records are keyed by the logical identity of a bid: one record
/// per (round, item, bidder).
type BidKey = (RoundId, ItemId, PartyId);

#[derive(Debug, Default)]
struct Inner {
    rounds: BTreeMap<RoundId, Round>,
    bids: BTreeMap<BidKey, Bid>,
    /// Append-only, insertion order preserved.
    refunds: Vec<Refund>,
}

/// In-memory ledger store.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn insert_round(&self, round: Round) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().await;
        inner.rounds.insert(round.id, round);
        Ok(())
    }

    async fn round(&self, id: RoundId) -> Result<Option<Round>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner.rounds.get(&id).cloned())
    }

    async fn active_round(&self) -> Result<Option<Round>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner
            .rounds
            .values()
            .filter(|r| r.is_active())
            .max_by_key(|r| r.started_at)
            .cloned())
    }

    async fn supersede_active(&self, host: PartyId) -> Result<Vec<RoundId>, LedgerError> {
        let mut inner = self.inner.write().await;
        let mut superseded = Vec::new();
        for round in inner.rounds.values_mut() {
            if round.host == host && round.is_active() {
                round.status = RoundStatus::Closed;
                superseded.push(round.id);
            }
        }
        Ok(superseded)
    }

    async fn close_round(
        &self,
        id: RoundId,
        winner: Option<ItemId>,
    ) -> Result<CloseTransition, LedgerError> {
        let mut inner = self.inner.write().await;
        let round = inner
            .rounds
            .get_mut(&id)
            .ok_or(LedgerError::RoundNotFound(id))?;
        match round.status {
            RoundStatus::Active => {
                round.status = RoundStatus::Closed;
                round.winner = winner;
                Ok(CloseTransition::Transitioned)
            }
            RoundStatus::Closed => Ok(CloseTransition::AlreadyClosed),
        }
    }

    async fn rounds_for_host(
        &self,
        host: PartyId,
        limit: usize,
    ) -> Result<Vec<Round>, LedgerError> {
        let inner = self.inner.read().await;
        let mut rounds: Vec<Round> = inner
            .rounds
            .values()
            .filter(|r| r.host == host)
            .cloned()
            .collect();
        rounds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rounds.truncate(limit);
        Ok(rounds)
    }

    async fn upsert_bid(&self, upsert: BidUpsert) -> Result<Bid, LedgerError> {
        let mut inner = self.inner.write().await;
        let key = (upsert.round, upsert.item, upsert.bidder);
        let bid = inner
            .bids
            .entry(key)
            .and_modify(|existing| existing.raise(upsert.amount, upsert.now))
            .or_insert_with(|| {
                Bid::place(
                    upsert.round,
                    upsert.item,
                    upsert.bidder,
                    upsert.amount,
                    upsert.now,
                )
            });
        Ok(bid.clone())
    }

    async fn bid_for(
        &self,
        round: RoundId,
        item: ItemId,
        bidder: PartyId,
    ) -> Result<Option<Bid>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner.bids.get(&(round, item, bidder)).cloned())
    }

    async fn bids_for_round(&self, round: RoundId) -> Result<Vec<Bid>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner
            .bids
            .values()
            .filter(|b| b.round == round)
            .cloned()
            .collect())
    }

    async fn bids_for_bidder(
        &self,
        round: RoundId,
        bidder: PartyId,
    ) -> Result<Vec<Bid>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner
            .bids
            .values()
            .filter(|b| b.round == round && b.bidder == bidder)
            .cloned()
            .collect())
    }

    async fn insert_refunds(&self, refunds: &[Refund]) -> Result<(), LedgerError> {
        let mut inner = self.inner.write().await;
        inner.refunds.extend_from_slice(refunds);
        tracing::debug!(count = refunds.len(), "recorded refund obligations");
        Ok(())
    }

    async fn refunds_for_round(&self, round: RoundId) -> Result<Vec<Refund>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner
            .refunds
            .iter()
            .filter(|r| r.round == round)
            .cloned()
            .collect())
    }

    async fn refunds_for_bidder(
        &self,
        bidder: PartyId,
        limit: usize,
    ) -> Result<Vec<Refund>, LedgerError> {
        let inner = self.inner.read().await;
        let mut refunds: Vec<Refund> = inner
            .refunds
            .iter()
            .filter(|r| r.bidder == bidder)
            .cloned()
            .collect();
        refunds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        refunds.truncate(limit);
        Ok(refunds)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn upsert(round: RoundId, item: ItemId, bidder: PartyId, amount: i64) -> BidUpsert {
        BidUpsert {
            round,
            item,
            bidder,
            amount: Decimal::from(amount),
            now: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_round() {
        let ledger = MemoryLedger::new();
        let round = Round::open(PartyId::new(), 60, Utc::now());
        ledger.insert_round(round.clone()).await.unwrap();
        assert_eq!(ledger.round(round.id).await.unwrap(), Some(round));
    }

    #[tokio::test]
    async fn active_round_prefers_latest_start() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        let older = Round::open(PartyId::new(), 60, now - Duration::seconds(30));
        let newer = Round::open(PartyId::new(), 60, now);
        ledger.insert_round(older).await.unwrap();
        ledger.insert_round(newer.clone()).await.unwrap();
        assert_eq!(ledger.active_round().await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn supersede_touches_only_the_hosts_active_rounds() {
        let ledger = MemoryLedger::new();
        let host = PartyId::new();
        let other_host = PartyId::new();
        let mine = Round::open(host, 60, Utc::now());
        let theirs = Round::open(other_host, 60, Utc::now());
        ledger.insert_round(mine.clone()).await.unwrap();
        ledger.insert_round(theirs.clone()).await.unwrap();

        let superseded = ledger.supersede_active(host).await.unwrap();
        assert_eq!(superseded, vec![mine.id]);

        let mine_after = ledger.round(mine.id).await.unwrap().unwrap();
        assert_eq!(mine_after.status, RoundStatus::Closed);
        // Superseded, not completed: no winner.
        assert!(mine_after.winner.is_none());

        let theirs_after = ledger.round(theirs.id).await.unwrap().unwrap();
        assert!(theirs_after.is_active());
    }

    #[tokio::test]
    async fn close_transition_happens_exactly_once() {
        let ledger = MemoryLedger::new();
        let round = Round::open(PartyId::new(), 60, Utc::now());
        let winner = ItemId::new();
        ledger.insert_round(round.clone()).await.unwrap();

        let first = ledger.close_round(round.id, Some(winner)).await.unwrap();
        assert_eq!(first, CloseTransition::Transitioned);

        // The loser of the race must not overwrite the recorded winner.
        let second = ledger
            .close_round(round.id, Some(ItemId::new()))
            .await
            .unwrap();
        assert_eq!(second, CloseTransition::AlreadyClosed);

        let stored = ledger.round(round.id).await.unwrap().unwrap();
        assert_eq!(stored.winner, Some(winner));
    }

    #[tokio::test]
    async fn close_unknown_round_is_an_error() {
        let ledger = MemoryLedger::new();
        let missing = RoundId::new();
        let err = ledger.close_round(missing, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::RoundNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn upsert_raises_in_place() {
        let ledger = MemoryLedger::new();
        let (round, item, bidder) = (RoundId::new(), ItemId::new(), PartyId::new());

        let first = ledger
            .upsert_bid(upsert(round, item, bidder, 50))
            .await
            .unwrap();
        let second = ledger
            .upsert_bid(upsert(round, item, bidder, 120))
            .await
            .unwrap();

        // Same logical record: ID and creation time survive the raise.
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.amount, Decimal::from(120));
        assert_eq!(ledger.bids_for_round(round).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bids_are_scoped_per_round_and_bidder() {
        let ledger = MemoryLedger::new();
        let round = RoundId::new();
        let other_round = RoundId::new();
        let item = ItemId::new();
        let (x, y) = (PartyId::new(), PartyId::new());

        ledger.upsert_bid(upsert(round, item, x, 100)).await.unwrap();
        ledger.upsert_bid(upsert(round, item, y, 150)).await.unwrap();
        ledger
            .upsert_bid(upsert(other_round, item, x, 10))
            .await
            .unwrap();

        assert_eq!(ledger.bids_for_round(round).await.unwrap().len(), 2);
        let mine = ledger.bids_for_bidder(round, x).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine.first().unwrap().amount, Decimal::from(100));
    }

    #[tokio::test]
    async fn refunds_query_by_bidder_most_recent_first() {
        let ledger = MemoryLedger::new();
        let bidder = PartyId::new();
        let now = Utc::now();
        let older = Refund {
            id: encore_types::RefundId::new(),
            round: RoundId::new(),
            item: ItemId::new(),
            bidder,
            amount: Decimal::from(50),
            created_at: now - Duration::seconds(60),
        };
        let newer = Refund {
            id: encore_types::RefundId::new(),
            round: RoundId::new(),
            item: ItemId::new(),
            bidder,
            amount: Decimal::from(150),
            created_at: now,
        };
        ledger
            .insert_refunds(&[older.clone(), newer.clone()])
            .await
            .unwrap();

        let all = ledger.refunds_for_bidder(bidder, 50).await.unwrap();
        assert_eq!(all, vec![newer.clone(), older]);

        let limited = ledger.refunds_for_bidder(bidder, 1).await.unwrap();
        assert_eq!(limited, vec![newer]);
    }
}
