//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the auction system has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. All IDs use UUID v7
//! (time-ordered), which keeps database indexes append-friendly and makes
//! the item-id-ascending tie-break in the leaderboard equal to creation
//! order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one timed auction round.
    RoundId
}

define_id! {
    /// Unique identifier for a catalog item bidders compete over.
    ItemId
}

define_id! {
    /// Unique identifier for a bid record.
    ///
    /// A bid record is logical: one per (round, item, bidder). Raising a
    /// bid updates the record in place, so the ID is stable across
    /// resubmissions.
    BidId
}

define_id! {
    /// Unique identifier for a refund obligation.
    RefundId
}

define_id! {
    /// Unique identifier for a party (a host or a bidder).
    ///
    /// Identity resolution happens upstream; the core only ever sees the
    /// resolved party ID together with its [`Role`](crate::Role).
    PartyId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let round = RoundId::new();
        let item = ItemId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(round.into_inner(), Uuid::nil());
        assert_ne!(item.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = PartyId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<PartyId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }

    #[test]
    fn v7_ids_order_by_creation() {
        let first = ItemId::new();
        let second = ItemId::new();
        // UUID v7 is time-ordered; later IDs sort after earlier ones.
        assert!(first <= second);
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = RoundId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
