//! Transaction entries (the legs of a transaction).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, EntryId, TransactionId};

use super::error::LedgerError;

/// Number of decimal places an amount may carry.
pub const AMOUNT_SCALE: u32 = 2;

/// One account's debit or credit leg within a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    /// Entry ID.
    pub id: EntryId,
    /// Parent transaction.
    pub transaction_id: TransactionId,
    /// The account this leg posts to.
    pub account_id: AccountId,
    /// Debit amount, zero if this is a credit leg.
    pub debit: Decimal,
    /// Credit amount, zero if this is a debit leg.
    pub credit: Decimal,
}

impl TransactionEntry {
    /// Creates a validated entry.
    ///
    /// # Errors
    ///
    /// See [`validate_amounts`].
    pub fn new(
        transaction_id: TransactionId,
        account_id: AccountId,
        debit: Decimal,
        credit: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_amounts(debit, credit)?;
        Ok(Self {
            id: EntryId::new(),
            transaction_id,
            account_id,
            debit,
            credit,
        })
    }

    /// Returns `debit - credit`.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// An entry as supplied by a caller, before it belongs to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

impl EntryInput {
    /// A pure debit leg.
    #[must_use]
    pub const fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
        }
    }

    /// A pure credit leg.
    #[must_use]
    pub const fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
        }
    }
}

/// Checks the amounts of a single entry.
///
/// Debit and credit must both be non-negative, must not both be zero, and
/// must fit the stored precision. Both being positive is accepted here; the
/// transaction validator then sees the account on both sides.
///
/// # Errors
///
/// - `LedgerError::NegativeAmount` if either amount is negative
/// - `LedgerError::ZeroAmount` if both are zero
/// - `LedgerError::AmountOutOfRange` if an amount cannot be stored
pub fn validate_amounts(debit: Decimal, credit: Decimal) -> Result<(), LedgerError> {
    if debit < Decimal::ZERO || credit < Decimal::ZERO {
        return Err(LedgerError::NegativeAmount);
    }
    if debit.is_zero() && credit.is_zero() {
        return Err(LedgerError::ZeroAmount);
    }
    to_minor_units(debit)?;
    to_minor_units(credit)?;
    Ok(())
}

/// Converts an amount to integer minor units (cents).
///
/// # Errors
///
/// Returns `LedgerError::AmountOutOfRange` if the amount has more than
/// [`AMOUNT_SCALE`] decimal places or does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, LedgerError> {
    let mut scaled = amount;
    scaled.rescale(AMOUNT_SCALE);
    if scaled != amount {
        return Err(LedgerError::AmountOutOfRange(amount));
    }
    i64::try_from(scaled.mantissa()).map_err(|_| LedgerError::AmountOutOfRange(amount))
}

/// Converts integer minor units (cents) back to an amount.
#[must_use]
pub fn from_minor_units(units: i64) -> Decimal {
    Decimal::new(units, AMOUNT_SCALE)
}
