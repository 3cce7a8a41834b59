//! The round lifecycle state machine.
//!
//! A round moves `none -> active -> closed`, and `closed` is terminal.
//! Opening a round supersedes any active round the host still has
//! (abandoned, not completed: no winner, no refunds). Closing is
//! idempotent and race-free: the deadline timer and an explicit host
//! request both funnel into [`AuctionEngine::close_round`], where a
//! per-round mutex serializes closers and the ledger's conditional
//! update decides the single winner of the transition.
//!
//! Each active round owns exactly one cancellable deadline timer,
//! addressed by round identity. Cancellation is best-effort -- a timer
//! that fires after a manual close simply loses the close race and
//! becomes a no-op. Correctness never depends on cancellation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use encore_ledger::{CloseTransition, Ledger};
use encore_types::{
    AuctionEvent, Item, LeaderboardEntry, PartyId, Refund, RefundNotice, Round, RoundClosed,
    RoundId, RoundOpened, Snapshot, Winner,
};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::catalog::Catalog;
use crate::error::EngineError;
use crate::leaderboard;

/// Who asked for the close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseInitiator {
    /// The round's deadline timer fired.
    Timer,
    /// A host requested the close explicitly. The host must own the
    /// round.
    Host(PartyId),
}

/// The auction engine: round lifecycle, bid processing, and the
/// coordination state that makes both linearizable per round.
pub struct AuctionEngine {
    ledger: Arc<dyn Ledger>,
    catalog: Arc<dyn Catalog>,
    broadcaster: Arc<Broadcaster>,
    /// Per-round serialization locks. An entry exists while its round
    /// is live and is dropped once the round closes.
    locks: Mutex<HashMap<RoundId, Arc<Mutex<()>>>>,
    /// Outstanding deadline timers, at most one per active round.
    timers: Mutex<HashMap<RoundId, JoinHandle<()>>>,
}

impl AuctionEngine {
    /// Create an engine over the given collaborators.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        catalog: Arc<dyn Catalog>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            ledger,
            catalog,
            broadcaster,
            locks: Mutex::new(HashMap::new()),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Open a new round for `host`.
    ///
    /// Requires the host to own at least one catalog item. Any round
    /// the host still has active is force-closed first (superseded, not
    /// completed -- no winner, no refunds). Arms the deadline timer and
    /// broadcasts `round_opened` with the zeroed leaderboard.
    pub async fn open_round(
        self: &Arc<Self>,
        host: PartyId,
        host_name: &str,
        duration_seconds: u32,
    ) -> Result<Round, EngineError> {
        if duration_seconds == 0 {
            return Err(EngineError::InvalidDuration);
        }

        let items = self.catalog.items_for_host(host).await?;
        if items.is_empty() {
            return Err(EngineError::NoItems);
        }

        // Supersede whatever the host left running. The old round's
        // timer must not fire into a round we just abandoned.
        let superseded = self.ledger.supersede_active(host).await?;
        for old_id in &superseded {
            self.drop_timer(*old_id, true).await;
            self.locks.lock().await.remove(old_id);
            info!(round_id = %old_id, "superseded still-active round");
        }

        let round = Round::open(host, duration_seconds, Utc::now());
        self.ledger.insert_round(round.clone()).await?;
        self.arm_timer(round.id, duration_seconds).await;

        info!(
            round_id = %round.id,
            host = %host,
            duration_seconds,
            "round opened"
        );

        self.broadcaster
            .broadcast(AuctionEvent::RoundOpened(RoundOpened {
                round_id: round.id,
                host_name: host_name.to_owned(),
                duration_seconds,
                deadline: round.ends_at,
                items: items.iter().map(LeaderboardEntry::zeroed).collect(),
            }));

        Ok(round)
    }

    /// Close a round: compute the winner, record the refund set, and
    /// broadcast the result. Idempotent -- a caller that arrives after
    /// the transition (or loses the race for it) observes the first
    /// closer's result without re-running winner/refund logic.
    pub async fn close_round(
        &self,
        round_id: RoundId,
        initiator: CloseInitiator,
    ) -> Result<RoundClosed, EngineError> {
        let round = self
            .ledger
            .round(round_id)
            .await?
            .ok_or(EngineError::RoundNotFound(round_id))?;

        // A host can only close their own rounds; do not reveal other
        // hosts' round state through this endpoint.
        if let CloseInitiator::Host(host) = initiator
            && round.host != host
        {
            return Err(EngineError::RoundNotFound(round_id));
        }

        let lock = self.round_lock(round_id).await;
        let _guard = lock.lock().await;

        // Re-read now that we hold the round's lock: another closer may
        // have completed while we waited.
        let round = self
            .ledger
            .round(round_id)
            .await?
            .ok_or(EngineError::RoundNotFound(round_id))?;

        let items = self.catalog.items_for_host(round.host).await?;
        let bids = self.ledger.bids_for_round(round_id).await?;
        let entries = leaderboard::compute(&items, &bids);

        if !round.is_active() {
            return Ok(Self::already_closed(&round, entries));
        }

        let winner = leaderboard::winner(&entries).cloned();
        let winner_id = winner.as_ref().map(|w| w.item_id);

        match self.ledger.close_round(round_id, winner_id).await? {
            CloseTransition::Transitioned => {}
            // Lost the race despite the lock (e.g. an external writer
            // on a shared database). Same idempotent result.
            CloseTransition::AlreadyClosed => {
                let round = self
                    .ledger
                    .round(round_id)
                    .await?
                    .ok_or(EngineError::RoundNotFound(round_id))?;
                return Ok(Self::already_closed(&round, entries));
            }
        }

        // Every bid on a non-winning item becomes a refund obligation;
        // with no winner, every bid does.
        let now = Utc::now();
        let refunds: Vec<Refund> = bids
            .iter()
            .filter(|bid| winner_id.is_none_or(|w| bid.item != w))
            .map(|bid| Refund::for_bid(bid, now))
            .collect();
        self.ledger.insert_refunds(&refunds).await?;

        // The timer is no longer needed. If the timer itself initiated
        // this close it is the running task, so only detach it.
        self.drop_timer(round_id, initiator != CloseInitiator::Timer)
            .await;
        self.locks.lock().await.remove(&round_id);

        info!(
            round_id = %round_id,
            winner = winner
                .as_ref()
                .map_or_else(|| "none".to_owned(), |w| w.item_id.to_string()),
            refunds = refunds.len(),
            "round closed"
        );

        let closed = RoundClosed {
            round_id,
            winner: winner.map(|entry| Winner {
                item_id: entry.item_id,
                title: entry.title,
                artist: entry.artist,
                total: entry.total,
            }),
            items: entries,
        };
        self.broadcaster
            .broadcast(AuctionEvent::RoundClosed(closed.clone()));
        self.send_refund_notices(round_id, &refunds, &items).await;

        Ok(closed)
    }

    /// The full current-state snapshot, or `None` when no round is
    /// active.
    pub async fn snapshot(&self) -> Result<Option<Snapshot>, EngineError> {
        let Some(round) = self.ledger.active_round().await? else {
            return Ok(None);
        };
        let items = self.catalog.items_for_host(round.host).await?;
        let bids = self.ledger.bids_for_round(round.id).await?;
        Ok(Some(Snapshot {
            items: leaderboard::compute(&items, &bids),
            round,
            server_time: Utc::now(),
        }))
    }

    /// The ledger this engine coordinates. Pull-style queries (refund
    /// history, past rounds) go straight to it.
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// The catalog collaborator.
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// The broadcast hub.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    // -- internals ----------------------------------------------------

    /// The serialization lock for one round, created on first use.
    pub(crate) async fn round_lock(&self, id: RoundId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(id).or_default())
    }

    /// Spawn the deadline timer for a round and register its handle.
    async fn arm_timer(self: &Arc<Self>, round_id: RoundId, duration_seconds: u32) {
        let mut timers = self.timers.lock().await;
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(u64::from(duration_seconds))).await;
            // Losing to a manual close is expected and resolves to the
            // same result; only real failures are worth a warning.
            if let Err(e) = engine.close_round(round_id, CloseInitiator::Timer).await {
                warn!(round_id = %round_id, error = %e, "deadline close failed");
            }
        });
        timers.insert(round_id, handle);
    }

    /// Remove a round's timer, aborting it when `abort` is set. The
    /// close path passes `abort = false` when the timer itself is the
    /// caller, since aborting the running task would cancel the close.
    async fn drop_timer(&self, round_id: RoundId, abort: bool) {
        if let Some(handle) = self.timers.lock().await.remove(&round_id)
            && abort
        {
            handle.abort();
        }
    }

    /// Build the idempotent close result from an already-closed round.
    fn already_closed(round: &Round, entries: Vec<LeaderboardEntry>) -> RoundClosed {
        let winner = round.winner.and_then(|id| {
            entries
                .iter()
                .find(|e| e.item_id == id)
                .map(|entry| Winner {
                    item_id: entry.item_id,
                    title: entry.title.clone(),
                    artist: entry.artist.clone(),
                    total: entry.total,
                })
        });
        RoundClosed {
            round_id: round.id,
            winner,
            items: entries,
        }
    }

    /// Group the refund set per bidder and unicast one combined notice
    /// to each affected party that is currently connected.
    async fn send_refund_notices(&self, round_id: RoundId, refunds: &[Refund], items: &[Item]) {
        if refunds.is_empty() {
            return;
        }

        let titles: BTreeMap<_, _> = items
            .iter()
            .map(|item| (item.id, item.title.clone()))
            .collect();

        let mut grouped: BTreeMap<PartyId, (Decimal, Vec<String>)> = BTreeMap::new();
        for refund in refunds {
            let (total, item_titles) = grouped.entry(refund.bidder).or_default();
            *total = total.checked_add(refund.amount).unwrap_or(Decimal::MAX);
            if let Some(title) = titles.get(&refund.item) {
                item_titles.push(title.clone());
            }
        }

        for (bidder, (total_amount, item_titles)) in grouped {
            self.broadcaster
                .notify_refund(
                    bidder,
                    RefundNotice {
                        round_id,
                        total_amount,
                        item_titles,
                    },
                )
                .await;
        }
    }
}
