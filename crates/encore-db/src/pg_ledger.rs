//! `PostgreSQL` implementation of the [`Ledger`] trait.
//!
//! Row structs mirror the migration schema; conversions back to the
//! domain types live next to them. The close-once transition is the
//! conditional `UPDATE` in [`PgLedger::close_round`] -- `rows_affected`
//! tells the caller whether it won the race.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use encore_ledger::{BidUpsert, CloseTransition, Ledger, LedgerError};
use encore_types::{Bid, BidId, ItemId, PartyId, Refund, Round, RoundId, RoundStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::postgres::PostgresPool;

/// Ledger backend over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Create a ledger over an established connection pool.
    pub fn new(pool: &PostgresPool) -> Self {
        Self {
            pool: pool.pool().clone(),
        }
    }
}

/// Collapse a driver error into the backend-agnostic storage variant.
fn storage(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

#[async_trait]
impl Ledger for PgLedger {
    async fn insert_round(&self, round: Round) -> Result<(), LedgerError> {
        sqlx::query(
            r"INSERT INTO rounds (id, host_id, status, duration_seconds, started_at, ends_at, winner_item_id, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(round.id.into_inner())
        .bind(round.host.into_inner())
        .bind(round.status.as_str())
        .bind(i32::try_from(round.duration_seconds).unwrap_or(i32::MAX))
        .bind(round.started_at)
        .bind(round.ends_at)
        .bind(round.winner.map(ItemId::into_inner))
        .bind(round.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn round(&self, id: RoundId) -> Result<Option<Round>, LedgerError> {
        let row = sqlx::query_as::<_, RoundRow>(
            r"SELECT id, host_id, status, duration_seconds, started_at, ends_at, winner_item_id, created_at
              FROM rounds WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(RoundRow::into_round).transpose()
    }

    async fn active_round(&self) -> Result<Option<Round>, LedgerError> {
        let row = sqlx::query_as::<_, RoundRow>(
            r"SELECT id, host_id, status, duration_seconds, started_at, ends_at, winner_item_id, created_at
              FROM rounds WHERE status = 'active'
              ORDER BY started_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(RoundRow::into_round).transpose()
    }

    async fn supersede_active(&self, host: PartyId) -> Result<Vec<RoundId>, LedgerError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r"UPDATE rounds SET status = 'closed'
              WHERE host_id = $1 AND status = 'active'
              RETURNING id",
        )
        .bind(host.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(|(id,)| RoundId::from(id)).collect())
    }

    async fn close_round(
        &self,
        id: RoundId,
        winner: Option<ItemId>,
    ) -> Result<CloseTransition, LedgerError> {
        let result = sqlx::query(
            r"UPDATE rounds SET status = 'closed', winner_item_id = $2
              WHERE id = $1 AND status = 'active'",
        )
        .bind(id.into_inner())
        .bind(winner.map(ItemId::into_inner))
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 1 {
            return Ok(CloseTransition::Transitioned);
        }

        // Zero rows: either the round is already closed or it never
        // existed. Distinguish so callers can report RoundNotFound.
        let exists: Option<(Uuid,)> = sqlx::query_as(r"SELECT id FROM rounds WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        exists
            .map(|_| CloseTransition::AlreadyClosed)
            .ok_or(LedgerError::RoundNotFound(id))
    }

    async fn rounds_for_host(
        &self,
        host: PartyId,
        limit: usize,
    ) -> Result<Vec<Round>, LedgerError> {
        let rows = sqlx::query_as::<_, RoundRow>(
            r"SELECT id, host_id, status, duration_seconds, started_at, ends_at, winner_item_id, created_at
              FROM rounds WHERE host_id = $1
              ORDER BY created_at DESC LIMIT $2",
        )
        .bind(host.into_inner())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.into_iter().map(RoundRow::into_round).collect()
    }

    async fn upsert_bid(&self, upsert: BidUpsert) -> Result<Bid, LedgerError> {
        // The fresh ID only survives on first insert; on conflict the
        // stored row keeps its identity and creation time.
        let row = sqlx::query_as::<_, BidRow>(
            r"INSERT INTO bids (id, round_id, item_id, bidder_id, amount, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $6)
              ON CONFLICT (round_id, item_id, bidder_id)
              DO UPDATE SET amount = EXCLUDED.amount, updated_at = EXCLUDED.updated_at
              RETURNING id, round_id, item_id, bidder_id, amount, created_at, updated_at",
        )
        .bind(BidId::new().into_inner())
        .bind(upsert.round.into_inner())
        .bind(upsert.item.into_inner())
        .bind(upsert.bidder.into_inner())
        .bind(upsert.amount)
        .bind(upsert.now)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.into_bid())
    }

    async fn bid_for(
        &self,
        round: RoundId,
        item: ItemId,
        bidder: PartyId,
    ) -> Result<Option<Bid>, LedgerError> {
        let row = sqlx::query_as::<_, BidRow>(
            r"SELECT id, round_id, item_id, bidder_id, amount, created_at, updated_at
              FROM bids WHERE round_id = $1 AND item_id = $2 AND bidder_id = $3",
        )
        .bind(round.into_inner())
        .bind(item.into_inner())
        .bind(bidder.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(BidRow::into_bid))
    }

    async fn bids_for_round(&self, round: RoundId) -> Result<Vec<Bid>, LedgerError> {
        let rows = sqlx::query_as::<_, BidRow>(
            r"SELECT id, round_id, item_id, bidder_id, amount, created_at, updated_at
              FROM bids WHERE round_id = $1
              ORDER BY item_id, bidder_id",
        )
        .bind(round.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(BidRow::into_bid).collect())
    }

    async fn bids_for_bidder(
        &self,
        round: RoundId,
        bidder: PartyId,
    ) -> Result<Vec<Bid>, LedgerError> {
        let rows = sqlx::query_as::<_, BidRow>(
            r"SELECT id, round_id, item_id, bidder_id, amount, created_at, updated_at
              FROM bids WHERE round_id = $1 AND bidder_id = $2
              ORDER BY item_id",
        )
        .bind(round.into_inner())
        .bind(bidder.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(BidRow::into_bid).collect())
    }

    async fn insert_refunds(&self, refunds: &[Refund]) -> Result<(), LedgerError> {
        if refunds.is_empty() {
            return Ok(());
        }

        // Single multi-row insert via UNNEST instead of N round-trips.
        let len = refunds.len();
        let mut ids = Vec::with_capacity(len);
        let mut round_ids = Vec::with_capacity(len);
        let mut item_ids = Vec::with_capacity(len);
        let mut bidder_ids = Vec::with_capacity(len);
        let mut amounts = Vec::with_capacity(len);
        let mut timestamps = Vec::with_capacity(len);

        for refund in refunds {
            ids.push(refund.id.into_inner());
            round_ids.push(refund.round.into_inner());
            item_ids.push(refund.item.into_inner());
            bidder_ids.push(refund.bidder.into_inner());
            amounts.push(refund.amount);
            timestamps.push(refund.created_at);
        }

        sqlx::query(
            r"INSERT INTO refunds (id, round_id, item_id, bidder_id, amount, created_at)
              SELECT * FROM UNNEST($1::UUID[], $2::UUID[], $3::UUID[], $4::UUID[], $5::NUMERIC[], $6::TIMESTAMPTZ[])",
        )
        .bind(&ids)
        .bind(&round_ids)
        .bind(&item_ids)
        .bind(&bidder_ids)
        .bind(&amounts)
        .bind(&timestamps)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        tracing::debug!(count = len, "recorded refund obligations");
        Ok(())
    }

    async fn refunds_for_round(&self, round: RoundId) -> Result<Vec<Refund>, LedgerError> {
        let rows = sqlx::query_as::<_, RefundRow>(
            r"SELECT id, round_id, item_id, bidder_id, amount, created_at
              FROM refunds WHERE round_id = $1
              ORDER BY created_at",
        )
        .bind(round.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(RefundRow::into_refund).collect())
    }

    async fn refunds_for_bidder(
        &self,
        bidder: PartyId,
        limit: usize,
    ) -> Result<Vec<Refund>, LedgerError> {
        let rows = sqlx::query_as::<_, RefundRow>(
            r"SELECT id, round_id, item_id, bidder_id, amount, created_at
              FROM refunds WHERE bidder_id = $1
              ORDER BY created_at DESC LIMIT $2",
        )
        .bind(bidder.into_inner())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(RefundRow::into_refund).collect())
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `rounds` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct RoundRow {
    id: Uuid,
    host_id: Uuid,
    status: String,
    duration_seconds: i32,
    started_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    winner_item_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl RoundRow {
    /// Convert back to the domain type.
    ///
    /// A status string outside the CHECK constraint's vocabulary means
    /// the store is corrupt, which surfaces as a storage error.
    fn into_round(self) -> Result<Round, LedgerError> {
        let status = RoundStatus::from_str(&self.status)
            .map_err(|e| LedgerError::Storage(format!("corrupt round row {}: {e}", self.id)))?;
        Ok(Round {
            id: RoundId::from(self.id),
            host: PartyId::from(self.host_id),
            status,
            duration_seconds: u32::try_from(self.duration_seconds).unwrap_or(0),
            started_at: self.started_at,
            ends_at: self.ends_at,
            winner: self.winner_item_id.map(ItemId::from),
            created_at: self.created_at,
        })
    }
}

/// A row from the `bids` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct BidRow {
    id: Uuid,
    round_id: Uuid,
    item_id: Uuid,
    bidder_id: Uuid,
    amount: rust_decimal::Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BidRow {
    fn into_bid(self) -> Bid {
        Bid {
            id: BidId::from(self.id),
            round: RoundId::from(self.round_id),
            item: ItemId::from(self.item_id),
            bidder: PartyId::from(self.bidder_id),
            amount: self.amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A row from the `refunds` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct RefundRow {
    id: Uuid,
    round_id: Uuid,
    item_id: Uuid,
    bidder_id: Uuid,
    amount: rust_decimal::Decimal,
    created_at: DateTime<Utc>,
}

impl RefundRow {
    fn into_refund(self) -> Refund {
        Refund {
            id: encore_types::RefundId::from(self.id),
            round: RoundId::from(self.round_id),
            item: ItemId::from(self.item_id),
            bidder: PartyId::from(self.bidder_id),
            amount: self.amount,
            created_at: self.created_at,
        }
    }
}
