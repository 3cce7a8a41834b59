//! Pure leaderboard aggregation.
//!
//! The aggregator is a stateless function of (catalog items, bid set):
//! per-item bid totals and distinct bidder counts, sorted
//! total-descending with item-id-ascending as the deterministic
//! tie-break. Nothing here is ever cached or persisted -- recomputing
//! from the ledger's bid set at any point reproduces exactly the
//! leaderboard that was last broadcast, which is what makes recovery
//! after a crash with an in-flight round possible.

use std::collections::BTreeMap;

use encore_types::{Bid, Item, ItemId, LeaderboardEntry, PartyId};
use rust_decimal::Decimal;

/// Compute the leaderboard for one round.
///
/// Every item of the host appears, including items with no bids (zero
/// total, zero bidders). Bids referencing items outside `items` are
/// ignored; the bid processor rejects them before they are recorded, so
/// such a bid would indicate a catalog item removed mid-round.
pub fn compute(items: &[Item], bids: &[Bid]) -> Vec<LeaderboardEntry> {
    let mut totals: BTreeMap<ItemId, (Decimal, std::collections::BTreeSet<PartyId>)> =
        BTreeMap::new();

    for bid in bids {
        let (total, bidders) = totals.entry(bid.item).or_default();
        // Saturate rather than wrap; Decimal covers any realistic sum.
        *total = total.checked_add(bid.amount).unwrap_or(Decimal::MAX);
        bidders.insert(bid.bidder);
    }

    let mut entries: Vec<LeaderboardEntry> = items
        .iter()
        .map(|item| {
            totals.get(&item.id).map_or_else(
                || LeaderboardEntry::zeroed(item),
                |(total, bidders)| LeaderboardEntry {
                    item_id: item.id,
                    title: item.title.clone(),
                    artist: item.artist.clone(),
                    total: *total,
                    bidders: u32::try_from(bidders.len()).unwrap_or(u32::MAX),
                },
            )
        })
        .collect();

    entries.sort_by(|a, b| b.total.cmp(&a.total).then(a.item_id.cmp(&b.item_id)));
    entries
}

/// The winning entry: the first leaderboard entry with at least one bid.
///
/// Entries are total-descending, so the first entry with a bidder holds
/// the strictly highest total (ties already resolved by the sort's
/// item-id-ascending order). Returns `None` when no item has any bid.
pub fn winner(entries: &[LeaderboardEntry]) -> Option<&LeaderboardEntry> {
    entries.iter().find(|e| e.bidders > 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use encore_types::RoundId;

    use super::*;

    fn item(host: PartyId, title: &str) -> Item {
        Item::new(host, title.to_owned(), "artist".to_owned(), Utc::now())
    }

    fn bid(round: RoundId, item: ItemId, bidder: PartyId, amount: i64) -> Bid {
        Bid::place(round, item, bidder, Decimal::from(amount), Utc::now())
    }

    #[test]
    fn totals_and_distinct_bidders_per_item() {
        let host = PartyId::new();
        let round = RoundId::new();
        let a = item(host, "A");
        let b = item(host, "B");
        let (x, y) = (PartyId::new(), PartyId::new());

        let bids = vec![
            bid(round, a.id, x, 200),
            bid(round, a.id, y, 100),
            bid(round, b.id, y, 150),
        ];
        let board = compute(&[a.clone(), b.clone()], &bids);

        assert_eq!(board.len(), 2);
        let first = board.first().unwrap();
        assert_eq!(first.item_id, a.id);
        assert_eq!(first.total, Decimal::from(300));
        assert_eq!(first.bidders, 2);
        let second = board.get(1).unwrap();
        assert_eq!(second.item_id, b.id);
        assert_eq!(second.total, Decimal::from(150));
        assert_eq!(second.bidders, 1);
    }

    #[test]
    fn items_without_bids_appear_zeroed() {
        let host = PartyId::new();
        let a = item(host, "A");
        let board = compute(&[a.clone()], &[]);
        assert_eq!(board.len(), 1);
        assert_eq!(board.first().unwrap().total, Decimal::ZERO);
        assert_eq!(board.first().unwrap().bidders, 0);
    }

    #[test]
    fn ties_break_by_item_id_ascending() {
        let host = PartyId::new();
        let round = RoundId::new();
        // `a` is created before `b`, so its time-ordered ID is smaller.
        let a = item(host, "A");
        let b = item(host, "B");
        let bids = vec![
            bid(round, b.id, PartyId::new(), 100),
            bid(round, a.id, PartyId::new(), 100),
        ];
        let board = compute(&[a.clone(), b.clone()], &bids);
        assert_eq!(board.first().unwrap().item_id, a.id);
        assert_eq!(board.get(1).unwrap().item_id, b.id);
    }

    #[test]
    fn winner_requires_at_least_one_bid() {
        let host = PartyId::new();
        let a = item(host, "A");
        let b = item(host, "B");
        let board = compute(&[a.clone(), b.clone()], &[]);
        assert!(winner(&board).is_none());

        let round = RoundId::new();
        let bids = vec![bid(round, b.id, PartyId::new(), 50)];
        let board = compute(&[a, b.clone()], &bids);
        // `a` has the smaller ID but no bids; `b` must win.
        assert_eq!(winner(&board).unwrap().item_id, b.id);
    }

    #[test]
    fn recomputation_is_deterministic() {
        let host = PartyId::new();
        let round = RoundId::new();
        let a = item(host, "A");
        let b = item(host, "B");
        let bids = vec![
            bid(round, a.id, PartyId::new(), 10),
            bid(round, b.id, PartyId::new(), 20),
            bid(round, a.id, PartyId::new(), 30),
        ];
        let items = [a, b];
        assert_eq!(compute(&items, &bids), compute(&items, &bids));
    }
}
