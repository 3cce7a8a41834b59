//! Error types for the ledger boundary.
//!
//! [`LedgerError`] is deliberately backend-agnostic: the trait lives in
//! this crate, so backend-specific failures (e.g. `sqlx` errors in
//! `encore-db`) are carried as a [`LedgerError::Storage`] message rather
//! than leaking the driver type through the seam.

use encore_types::RoundId;

/// Errors that can occur in a ledger backend.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The referenced round does not exist.
    #[error("round not found: {0}")]
    RoundNotFound(RoundId),

    /// The backing store failed. Treated as transient by callers: the
    /// committed state is whatever the store last durably held.
    #[error("storage error: {0}")]
    Storage(String),
}
