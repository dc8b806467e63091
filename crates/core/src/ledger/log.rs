//! Append-only audit log of transaction state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{LogId, TransactionId, UserId};

use super::error::LedgerError;
use super::types::LogType;

/// One audit record. Never updated after it has been appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    /// Log ID.
    pub id: LogId,
    /// The transaction the record belongs to.
    pub transaction_id: TransactionId,
    /// What happened.
    pub log_type: LogType,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Who did it.
    pub actor: UserId,
    /// Optional free-text message.
    pub message: Option<String>,
}

/// Checks that `candidate` may be appended to a transaction's `existing` logs.
///
/// # Errors
///
/// - `LedgerError::LogImmutable` if a record with the same ID already exists
/// - `LedgerError::DuplicateLog` if the type is unique and already recorded
pub fn ensure_appendable(
    existing: &[TransactionLog],
    candidate: &TransactionLog,
) -> Result<(), LedgerError> {
    if existing.iter().any(|log| log.id == candidate.id) {
        return Err(LedgerError::LogImmutable(candidate.id));
    }
    if candidate.log_type.is_unique()
        && existing
            .iter()
            .any(|log| log.log_type == candidate.log_type)
    {
        return Err(LedgerError::DuplicateLog(candidate.log_type));
    }
    Ok(())
}

/// Normalizes a user-supplied message: blank messages are not stored.
#[must_use]
pub fn normalize_message(message: Option<&str>) -> Option<String> {
    message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
}
