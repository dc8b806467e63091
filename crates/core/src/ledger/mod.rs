//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Groups, accounts and settlements
//! - Transaction entries and the audit log
//! - The transaction aggregate and its validation rules
//! - Balance calculations and limit checks
//! - Default account provisioning
//! - Deposit, withdrawal and transfer helpers

pub mod balance;
pub mod entry;
pub mod error;
pub mod group;
pub mod log;
pub mod provision;
pub mod transaction;
pub mod transfer;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod validation_props;

pub use balance::{AccountStanding, BalanceBasis, LedgerLine};
pub use entry::{EntryInput, TransactionEntry};
pub use error::{ErrorKind, LedgerError};
pub use group::{Account, BalanceLimits, Group, Settlement};
pub use log::TransactionLog;
pub use provision::{DEFAULT_ACCOUNTS, DefaultAccount, UserAccountDefaults};
pub use transaction::{SettlementLink, Transaction};
pub use transfer::{Movement, MovementKind};
pub use types::{
    AccountType, LedgerScope, LogType, Role, TransactionFilter, TransactionState,
};
pub use validation::{AccountInfo, TransactionTotals};
