//! Durable `PostgreSQL` ledger backend for the Encore auction service.
//!
//! Implements the [`encore_ledger::Ledger`] trait against `PostgreSQL`.
//! The close-once transition is a conditional `UPDATE … WHERE status =
//! 'active'`, so the database row is the arbiter when concurrent closers
//! race. Leaderboards are never stored -- the engine re-derives them
//! from the `bids` table, which is what makes crash recovery with an
//! in-flight round possible.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time
//! checked) to avoid requiring a live database at build time. All
//! queries are parameterized.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool configuration and migrations
//! - [`pg_ledger`] -- the [`encore_ledger::Ledger`] implementation
//! - [`error`] -- data-layer error types

pub mod error;
pub mod pg_ledger;
pub mod postgres;

pub use error::DbError;
pub use pg_ledger::PgLedger;
pub use postgres::{PostgresConfig, PostgresPool};
