//! Balancing and consistency rules checked whenever a transaction is saved.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, GroupId, UserId};

use super::entry::TransactionEntry;
use super::error::LedgerError;

/// Information about an account needed for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// The group owning the account.
    pub group_id: GroupId,
    /// The member owning the account, if any.
    pub owner: Option<UserId>,
    /// Whether the account is held by the group itself.
    pub group_account: bool,
}

/// Transaction totals for validation and display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTotals {
    /// Sum of debit amounts.
    pub debit: Decimal,
    /// Sum of credit amounts.
    pub credit: Decimal,
}

impl TransactionTotals {
    /// Sums the debit and credit amounts of `entries`.
    #[must_use]
    pub fn of(entries: &[TransactionEntry]) -> Self {
        entries.iter().fold(Self::default(), |totals, entry| Self {
            debit: totals.debit + entry.debit,
            credit: totals.credit + entry.credit,
        })
    }

    /// Returns true if debits equal credits.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }
}

/// Validates the entries of a transaction belonging to `group_id`.
///
/// 1. Entries with a positive debit form the debit side, entries with a
///    positive credit the credit side.
/// 2. Every account on either side must belong to `group_id`.
/// 3. No account may appear on both sides.
/// 4. The two sides must sum to the same amount.
///
/// An empty entry list is balanced.
///
/// # Errors
///
/// - Errors from `account_lookup` (typically `AccountNotFound`)
/// - `LedgerError::GroupMismatch` for an account of another group
/// - `LedgerError::AccountOnBothSides` for an account on both sides
/// - `LedgerError::UnbalancedTransaction` if the sums differ
pub fn validate_entries<A>(
    group_id: GroupId,
    entries: &[TransactionEntry],
    account_lookup: A,
) -> Result<TransactionTotals, LedgerError>
where
    A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
{
    let mut totals = TransactionTotals::default();
    let mut debit_accounts = Vec::new();
    let mut credit_accounts = HashSet::new();

    for entry in entries {
        if entry.debit > Decimal::ZERO {
            totals.debit += entry.debit;
            debit_accounts.push(entry.account_id);
        }
        if entry.credit > Decimal::ZERO {
            totals.credit += entry.credit;
            credit_accounts.insert(entry.account_id);
        }
    }

    for entry in entries {
        if entry.debit > Decimal::ZERO || entry.credit > Decimal::ZERO {
            let account = account_lookup(entry.account_id)?;
            if account.group_id != group_id {
                return Err(LedgerError::GroupMismatch {
                    account_id: entry.account_id,
                    group_id,
                });
            }
        }
    }

    if let Some(account_id) = debit_accounts
        .iter()
        .find(|id| credit_accounts.contains(*id))
    {
        return Err(LedgerError::AccountOnBothSides(*account_id));
    }

    if !totals.is_balanced() {
        return Err(LedgerError::UnbalancedTransaction {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}
