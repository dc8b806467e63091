//! Deposits, withdrawals and transfers between accounts.
//!
//! A [`Movement`] describes one of the everyday money movements and knows
//! how to turn itself into the two legs of a transaction. Deposits and
//! withdrawals go through the group's bank account.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;

use super::entry::{EntryInput, validate_amounts};
use super::error::LedgerError;
use super::log::normalize_message;

/// The kind of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    /// Money paid in: the member is credited, the bank debited.
    Deposit,
    /// Money paid out: the member is debited, the bank credited.
    Withdrawal,
    /// Money moved between two accounts of the group.
    Transfer {
        /// Account receiving the money.
        to: AccountId,
    },
}

/// A money movement on one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// What kind of movement this is.
    pub kind: MovementKind,
    /// The member account the movement is made on (the source of a transfer).
    pub account_id: AccountId,
    /// Positive amount.
    pub amount: Decimal,
    /// Free-text details, used as the message of the pending log.
    pub details: Option<String>,
}

impl Movement {
    /// Money paid in to `account_id`.
    ///
    /// # Errors
    ///
    /// Entry amount errors unless `amount` is positive and storable.
    pub fn deposit(account_id: AccountId, amount: Decimal) -> Result<Self, LedgerError> {
        Self::build(MovementKind::Deposit, account_id, amount)
    }

    /// Money paid out from `account_id`.
    ///
    /// # Errors
    ///
    /// Entry amount errors unless `amount` is positive and storable.
    pub fn withdrawal(account_id: AccountId, amount: Decimal) -> Result<Self, LedgerError> {
        Self::build(MovementKind::Withdrawal, account_id, amount)
    }

    /// Money moved from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - entry amount errors unless `amount` is positive and storable
    /// - `LedgerError::AccountOnBothSides` if `from == to`
    pub fn transfer(from: AccountId, to: AccountId, amount: Decimal) -> Result<Self, LedgerError> {
        if from == to {
            return Err(LedgerError::AccountOnBothSides(from));
        }
        Self::build(MovementKind::Transfer { to }, from, amount)
    }

    fn build(
        kind: MovementKind,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        validate_amounts(amount, Decimal::ZERO)?;
        Ok(Self {
            kind,
            account_id,
            amount,
            details: None,
        })
    }

    /// Attaches free-text details. Blank details are dropped.
    #[must_use]
    pub fn with_details(mut self, details: Option<&str>) -> Self {
        self.details = normalize_message(details);
        self
    }

    /// Returns true if the legs need the group's bank account.
    #[must_use]
    pub const fn needs_bank_account(&self) -> bool {
        !matches!(self.kind, MovementKind::Transfer { .. })
    }

    /// Builds the debit leg and the credit leg, in that order.
    ///
    /// `bank_account` is ignored for transfers.
    #[must_use]
    pub const fn legs(&self, bank_account: AccountId) -> [EntryInput; 2] {
        match self.kind {
            MovementKind::Deposit => [
                EntryInput::debit(bank_account, self.amount),
                EntryInput::credit(self.account_id, self.amount),
            ],
            MovementKind::Withdrawal => [
                EntryInput::debit(self.account_id, self.amount),
                EntryInput::credit(bank_account, self.amount),
            ],
            MovementKind::Transfer { to } => [
                EntryInput::debit(self.account_id, self.amount),
                EntryInput::credit(to, self.amount),
            ],
        }
    }

    /// Returns true if the movement is committed right after submission:
    /// a transfer the source's signed balance covers.
    #[must_use]
    pub fn auto_commits(&self, source_signed_balance: Decimal) -> bool {
        matches!(self.kind, MovementKind::Transfer { .. }) && self.amount <= source_signed_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deposit_legs() {
        let (member, bank) = (AccountId::new(), AccountId::new());
        let movement = Movement::deposit(member, dec!(25)).unwrap();
        let [debit, credit] = movement.legs(bank);
        assert_eq!(debit.account_id, bank);
        assert_eq!(debit.debit, dec!(25));
        assert_eq!(credit.account_id, member);
        assert_eq!(credit.credit, dec!(25));
        assert!(movement.needs_bank_account());
        assert!(!movement.auto_commits(dec!(1000)));
    }

    #[test]
    fn test_withdrawal_legs() {
        let (member, bank) = (AccountId::new(), AccountId::new());
        let [debit, credit] = Movement::withdrawal(member, dec!(5)).unwrap().legs(bank);
        assert_eq!(debit.account_id, member);
        assert_eq!(credit.account_id, bank);
    }

    #[test]
    fn test_transfer_legs_ignore_bank() {
        let (from, to, bank) = (AccountId::new(), AccountId::new(), AccountId::new());
        let movement = Movement::transfer(from, to, dec!(10)).unwrap();
        assert!(!movement.needs_bank_account());
        let [debit, credit] = movement.legs(bank);
        assert_eq!(debit.account_id, from);
        assert_eq!(credit.account_id, to);
    }

    #[rstest]
    #[case(dec!(100), dec!(100), true)]
    #[case(dec!(100), dec!(99.99), false)]
    #[case(dec!(1), dec!(-5), false)]
    fn test_transfer_auto_commit(
        #[case] amount: Decimal,
        #[case] signed: Decimal,
        #[case] expected: bool,
    ) {
        let movement = Movement::transfer(AccountId::new(), AccountId::new(), amount).unwrap();
        assert_eq!(movement.auto_commits(signed), expected);
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-1))]
    #[case(dec!(0.001))]
    fn test_invalid_amounts(#[case] amount: Decimal) {
        let err = Movement::deposit(AccountId::new(), amount).unwrap_err();
        assert!(err.is_invalid_transaction());
    }

    #[test]
    fn test_transfer_to_self_rejected() {
        let id = AccountId::new();
        assert!(matches!(
            Movement::transfer(id, id, dec!(1)),
            Err(LedgerError::AccountOnBothSides(_))
        ));
    }

    #[test]
    fn test_blank_details_dropped() {
        let movement = Movement::deposit(AccountId::new(), dec!(1))
            .unwrap()
            .with_details(Some("   "));
        assert_eq!(movement.details, None);
    }
}
