//! Event fan-out and the refund-notice subscription registry.
//!
//! Global state-changing events travel on a [`broadcast`] channel that
//! every connected party subscribes to. Personalized refund notices use
//! an explicit registry mapping party identity to delivery channels,
//! which decouples the coordinator from any particular transport's
//! connection objects.
//!
//! Delivery is best-effort by design: the ledger is authoritative, so a
//! dropped or lagging receiver is logged and otherwise ignored, and
//! delivery failures are never escalated to the operation that
//! triggered the event.

use std::collections::HashMap;

use encore_types::{AuctionEvent, PartyId, RefundNotice};
use tokio::sync::{RwLock, broadcast, mpsc};
use uuid::Uuid;

/// Capacity of the broadcast channel for auction events.
///
/// A subscriber that falls behind by more than this many messages
/// receives a `Lagged` error and skips to the newest event; the next
/// event carries the full leaderboard, so no state is lost.
const BROADCAST_CAPACITY: usize = 256;

/// Ephemeral identifier for one registered connection.
///
/// A party may be connected more than once (several tabs, a phone and a
/// laptop); each connection registers separately and is removed by this
/// handle when it goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

/// Fan-out hub for auction events and personalized refund notices.
pub struct Broadcaster {
    events: broadcast::Sender<AuctionEvent>,
    refunds: RwLock<HashMap<PartyId, HashMap<ConnectionId, mpsc::UnboundedSender<RefundNotice>>>>,
}

impl Broadcaster {
    /// Create a broadcaster with the default channel capacity.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            events,
            refunds: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to the global event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<AuctionEvent> {
        self.events.subscribe()
    }

    /// Publish an event to every subscriber.
    ///
    /// Returns the number of receivers. Zero receivers is normal (no
    /// client connected), not an error.
    pub fn broadcast(&self, event: AuctionEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Register a connection for `party` and return its unicast refund
    /// channel.
    pub async fn register(&self, party: PartyId) -> (ConnectionId, mpsc::UnboundedReceiver<RefundNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new();
        let mut refunds = self.refunds.write().await;
        refunds.entry(party).or_default().insert(id, tx);
        (id, rx)
    }

    /// Remove a connection from the registry.
    pub async fn unregister(&self, party: PartyId, id: ConnectionId) {
        let mut refunds = self.refunds.write().await;
        if let Some(connections) = refunds.get_mut(&party) {
            connections.remove(&id);
            if connections.is_empty() {
                refunds.remove(&party);
            }
        }
    }

    /// Deliver a refund notice to every connection `party` currently
    /// has open. Parties with no open connection simply miss the push;
    /// the obligation stays durable in the ledger.
    pub async fn notify_refund(&self, party: PartyId, notice: RefundNotice) {
        let refunds = self.refunds.read().await;
        let Some(connections) = refunds.get(&party) else {
            tracing::debug!(%party, "refund notice skipped: party not connected");
            return;
        };
        for sender in connections.values() {
            if sender.send(notice.clone()).is_err() {
                tracing::debug!(%party, "refund notice dropped: connection gone");
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use encore_types::{RoundClosed, RoundId};
    use rust_decimal::Decimal;

    use super::*;

    fn closed_event() -> AuctionEvent {
        AuctionEvent::RoundClosed(RoundClosed {
            round_id: RoundId::new(),
            winner: None,
            items: Vec::new(),
        })
    }

    #[tokio::test]
    async fn subscribers_receive_broadcast_events() {
        let broadcaster = Broadcaster::new();
        let mut rx = broadcaster.subscribe();
        let event = closed_event();
        assert_eq!(broadcaster.broadcast(event.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_not_an_error() {
        let broadcaster = Broadcaster::new();
        assert_eq!(broadcaster.broadcast(closed_event()), 0);
    }

    #[tokio::test]
    async fn refund_notice_reaches_only_the_target_party() {
        let broadcaster = Broadcaster::new();
        let (alice, bob) = (PartyId::new(), PartyId::new());
        let (_alice_conn, mut alice_rx) = broadcaster.register(alice).await;
        let (_bob_conn, mut bob_rx) = broadcaster.register(bob).await;

        let notice = RefundNotice {
            round_id: RoundId::new(),
            total_amount: Decimal::from(150),
            item_titles: vec!["B".to_owned()],
        };
        broadcaster.notify_refund(alice, notice.clone()).await;

        assert_eq!(alice_rx.recv().await.unwrap(), notice);
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregistered_connections_stop_receiving() {
        let broadcaster = Broadcaster::new();
        let party = PartyId::new();
        let (conn, mut rx) = broadcaster.register(party).await;
        broadcaster.unregister(party, conn).await;

        let notice = RefundNotice {
            round_id: RoundId::new(),
            total_amount: Decimal::from(10),
            item_titles: Vec::new(),
        };
        broadcaster.notify_refund(party, notice).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn multiple_connections_per_party_all_receive() {
        let broadcaster = Broadcaster::new();
        let party = PartyId::new();
        let (_c1, mut rx1) = broadcaster.register(party).await;
        let (_c2, mut rx2) = broadcaster.register(party).await;

        let notice = RefundNotice {
            round_id: RoundId::new(),
            total_amount: Decimal::from(75),
            item_titles: vec!["A".to_owned()],
        };
        broadcaster.notify_refund(party, notice.clone()).await;
        assert_eq!(rx1.recv().await.unwrap(), notice);
        assert_eq!(rx2.recv().await.unwrap(), notice);
    }
}
