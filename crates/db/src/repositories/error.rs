//! Mapping of storage errors onto ledger errors.

use sea_orm::{DbErr, SqlErr};
use tally_core::ledger::LedgerError;

/// Converts a `SeaORM` error into a [`LedgerError`].
///
/// Unique-constraint violations become `Conflict`; everything else is an
/// opaque `Database` error.
pub(crate) fn db_err(err: DbErr) -> LedgerError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => LedgerError::Conflict(detail),
        _ => LedgerError::Database(err.to_string()),
    }
}
