//! Error types for the data layer.
//!
//! [`DbError`] wraps the underlying [`sqlx`] errors with context about
//! which concern failed. At the ledger seam it collapses into
//! [`encore_ledger::LedgerError::Storage`] so the trait stays free of
//! driver types.

use encore_ledger::LedgerError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        Self::Storage(err.to_string())
    }
}
