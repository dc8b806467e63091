//! Ledger error types.
//!
//! Every failure the ledger can report is a `LedgerError` variant. Variants
//! fall into the coarse classes of [`ErrorKind`]; callers that only care
//! whether a business rule was broken use [`LedgerError::is_invalid_transaction`].

use rust_decimal::Decimal;
use tally_shared::types::{AccountId, GroupId, LogId, SettlementId, TransactionId};
use thiserror::Error;

use super::types::{LogType, Role, TransactionState};

/// Coarse classification of ledger errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A transaction-level business rule was broken.
    InvalidTransaction,
    /// An entry-level rule was broken.
    InvalidTransactionEntry,
    /// A log-level rule was broken.
    InvalidTransactionLog,
    /// A record failed a field validation.
    Validation,
    /// A lookup found nothing.
    NotFound,
    /// A uniqueness constraint was violated.
    Conflict,
    /// Storage or other internal failure.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Transaction Errors ==========
    /// Transaction is not balanced (debits != credits).
    #[error("Transaction is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedTransaction {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// An entry references an account of another group.
    #[error("Account {account_id} does not belong to group {group_id}")]
    GroupMismatch {
        /// The offending account.
        account_id: AccountId,
        /// The group of the transaction.
        group_id: GroupId,
    },

    /// The same account is debited and credited in one transaction.
    #[error("Account {0} is used as both debit and credit")]
    AccountOnBothSides(AccountId),

    /// The requested state transition is not allowed.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: TransactionState,
        /// The attempted target state.
        to: TransactionState,
    },

    /// The transaction belongs to a closed settlement.
    #[error("Settlement {0} is closed")]
    SettlementClosed(SettlementId),

    /// Only transactions that were never submitted can be deleted.
    #[error("Can only delete new transactions")]
    CanOnlyDeleteNew,

    // ========== Entry Errors ==========
    /// Entry amount cannot be negative.
    #[error("Entry amount cannot be negative")]
    NegativeAmount,

    /// Entry debit and credit cannot both be zero.
    #[error("Entry debit and credit cannot both be zero")]
    ZeroAmount,

    /// Entry amount has more than two decimal places or is out of range.
    #[error("Entry amount {0} cannot be stored")]
    AmountOutOfRange(Decimal),

    /// The account already has an entry in this transaction.
    #[error("Account {0} already has an entry in this transaction")]
    DuplicateEntryAccount(AccountId),

    /// The account has no entry in this transaction.
    #[error("Account {0} has no entry in this transaction")]
    EntryNotFound(AccountId),

    /// Entries of committed or rejected transactions cannot change.
    #[error("Cannot modify entries of a {0} transaction")]
    TransactionFrozen(TransactionState),

    // ========== Log Errors ==========
    /// A unique log type was recorded twice.
    #[error("Transaction already has a {0} log")]
    DuplicateLog(LogType),

    /// Log records cannot be saved again.
    #[error("Log {0} already exists and cannot be modified")]
    LogImmutable(LogId),

    // ========== Validation Errors ==========
    /// Slug must not be empty.
    #[error("Slug must not be empty")]
    EmptySlug,

    // ========== Lookup Errors ==========
    /// Group not found.
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Settlement not found.
    #[error("Settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The group has no account tagged with the role.
    #[error("Group {group_id} has no {role} account")]
    RoleAccountNotFound {
        /// The group.
        group_id: GroupId,
        /// The missing role.
        role: Role,
    },

    // ========== Conflict Errors ==========
    /// Uniqueness constraint violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    // ========== Internal Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnbalancedTransaction { .. }
            | Self::GroupMismatch { .. }
            | Self::AccountOnBothSides(_)
            | Self::InvalidStateTransition { .. }
            | Self::SettlementClosed(_)
            | Self::CanOnlyDeleteNew => ErrorKind::InvalidTransaction,

            Self::NegativeAmount
            | Self::ZeroAmount
            | Self::AmountOutOfRange(_)
            | Self::DuplicateEntryAccount(_)
            | Self::EntryNotFound(_)
            | Self::TransactionFrozen(_) => ErrorKind::InvalidTransactionEntry,

            Self::DuplicateLog(_) | Self::LogImmutable(_) => ErrorKind::InvalidTransactionLog,

            Self::EmptySlug => ErrorKind::Validation,

            Self::GroupNotFound(_)
            | Self::AccountNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::SettlementNotFound(_)
            | Self::UserNotFound(_)
            | Self::RoleAccountNotFound { .. } => ErrorKind::NotFound,

            Self::Conflict(_) => ErrorKind::Conflict,

            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true for transaction, entry and log rule violations.
    #[must_use]
    pub const fn is_invalid_transaction(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidTransaction
                | ErrorKind::InvalidTransactionEntry
                | ErrorKind::InvalidTransactionLog
        )
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnbalancedTransaction { .. } => "UNBALANCED_TRANSACTION",
            Self::GroupMismatch { .. } => "GROUP_MISMATCH",
            Self::AccountOnBothSides(_) => "ACCOUNT_ON_BOTH_SIDES",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::SettlementClosed(_) => "SETTLEMENT_CLOSED",
            Self::CanOnlyDeleteNew => "CAN_ONLY_DELETE_NEW",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            Self::DuplicateEntryAccount(_) => "DUPLICATE_ENTRY_ACCOUNT",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::TransactionFrozen(_) => "TRANSACTION_FROZEN",
            Self::DuplicateLog(_) => "DUPLICATE_LOG",
            Self::LogImmutable(_) => "LOG_IMMUTABLE",
            Self::EmptySlug => "EMPTY_SLUG",
            Self::GroupNotFound(_) => "GROUP_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::SettlementNotFound(_) => "SETTLEMENT_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::RoleAccountNotFound { .. } => "ROLE_ACCOUNT_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
