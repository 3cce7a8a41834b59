//! Read boundary to the item catalog collaborator.
//!
//! Catalog CRUD is out of scope for the core; the engine only reads
//! item records to validate "item belongs to the round's host" and for
//! display fields. [`MemoryCatalog`] is the in-process implementation
//! with the minimal `add`/`list` affordance needed to operate the
//! system end to end.

use std::collections::BTreeMap;

use async_trait::async_trait;
use encore_types::{Item, ItemId, PartyId};
use tokio::sync::RwLock;

/// Errors surfaced by a catalog backend.
#[derive(Debug, thiserror::Error)]
#[error("catalog error: {0}")]
pub struct CatalogError(pub String);

/// Read access to item records, plus the minimal mutation needed to
/// seed a host's catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch a single item.
    async fn item(&self, id: ItemId) -> Result<Option<Item>, CatalogError>;

    /// All items owned by a host, in creation order.
    async fn items_for_host(&self, host: PartyId) -> Result<Vec<Item>, CatalogError>;

    /// Add an item to its owner's catalog.
    async fn add_item(&self, item: Item) -> Result<(), CatalogError>;
}

/// In-memory catalog store.
///
/// Items are keyed by their time-ordered ID, so iteration order equals
/// creation order.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    items: RwLock<BTreeMap<ItemId, Item>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn item(&self, id: ItemId) -> Result<Option<Item>, CatalogError> {
        let items = self.items.read().await;
        Ok(items.get(&id).cloned())
    }

    async fn items_for_host(&self, host: PartyId) -> Result<Vec<Item>, CatalogError> {
        let items = self.items.read().await;
        Ok(items.values().filter(|i| i.host == host).cloned().collect())
    }

    async fn add_item(&self, item: Item) -> Result<(), CatalogError> {
        let mut items = self.items.write().await;
        items.insert(item.id, item);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn items_are_scoped_per_host() {
        let catalog = MemoryCatalog::new();
        let host = PartyId::new();
        let other = PartyId::new();

        let mine = Item::new(host, "Take Five".to_owned(), "Brubeck".to_owned(), Utc::now());
        let theirs = Item::new(other, "So What".to_owned(), "Davis".to_owned(), Utc::now());
        catalog.add_item(mine.clone()).await.unwrap();
        catalog.add_item(theirs).await.unwrap();

        let listed = catalog.items_for_host(host).await.unwrap();
        assert_eq!(listed, vec![mine]);
    }

    #[tokio::test]
    async fn listing_preserves_creation_order() {
        let catalog = MemoryCatalog::new();
        let host = PartyId::new();
        let first = Item::new(host, "A".to_owned(), "x".to_owned(), Utc::now());
        let second = Item::new(host, "B".to_owned(), "y".to_owned(), Utc::now());
        catalog.add_item(second.clone()).await.unwrap();
        catalog.add_item(first.clone()).await.unwrap();

        // Time-ordered IDs sort first-created first regardless of
        // insertion order.
        assert_eq!(catalog.items_for_host(host).await.unwrap(), vec![first, second]);
    }
}
