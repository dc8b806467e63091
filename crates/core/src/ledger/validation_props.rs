//! Property-based tests for entry and transaction validation rules.

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, EntryId, GroupId, TransactionId};

use super::entry::{TransactionEntry, validate_amounts};
use super::error::LedgerError;
use super::validation::{AccountInfo, validate_entries};

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a negative amount.
fn negative_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

fn entry(account_id: AccountId, debit: Decimal, credit: Decimal) -> TransactionEntry {
    TransactionEntry {
        id: EntryId::new(),
        transaction_id: TransactionId::new(),
        account_id,
        debit,
        credit,
    }
}

fn directory(group_id: GroupId, entries: &[TransactionEntry]) -> HashMap<AccountId, AccountInfo> {
    entries
        .iter()
        .map(|e| {
            (
                e.account_id,
                AccountInfo {
                    id: e.account_id,
                    group_id,
                    owner: None,
                    group_account: true,
                },
            )
        })
        .collect()
}

/// Splits `total` into `parts` positive amounts that sum back to `total`.
fn split(total: Decimal, parts: usize) -> Vec<Decimal> {
    let cents = (total * Decimal::ONE_HUNDRED).trunc();
    let count = Decimal::from(parts);
    let share = (cents / count).trunc();
    let mut amounts: Vec<Decimal> = (0..parts).map(|_| share / Decimal::ONE_HUNDRED).collect();
    let rest = (cents - share * count) / Decimal::ONE_HUNDRED;
    if let Some(last) = amounts.last_mut() {
        *last += rest;
    }
    amounts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Entry amount rules
    // =========================================================================

    #[test]
    fn prop_negative_amount_rejected(
        negative in negative_amount(),
        other in positive_amount(),
        on_debit in any::<bool>()
    ) {
        let (debit, credit) = if on_debit { (negative, other) } else { (other, negative) };
        let result = validate_amounts(debit, credit);
        prop_assert!(matches!(result, Err(LedgerError::NegativeAmount)));
    }

    #[test]
    fn prop_single_sided_amount_accepted(amount in positive_amount(), on_debit in any::<bool>()) {
        let (debit, credit) = if on_debit {
            (amount, Decimal::ZERO)
        } else {
            (Decimal::ZERO, amount)
        };
        prop_assert!(validate_amounts(debit, credit).is_ok());
    }

    // =========================================================================
    // Balanced transactions with distinct accounts always validate
    // =========================================================================

    #[test]
    fn prop_split_credit_validates(total in positive_amount(), parts in 1usize..6) {
        prop_assume!(total * Decimal::ONE_HUNDRED >= Decimal::from(parts));
        let group = GroupId::new();
        let mut entries = vec![entry(AccountId::new(), total, Decimal::ZERO)];
        for amount in split(total, parts) {
            entries.push(entry(AccountId::new(), Decimal::ZERO, amount));
        }
        let accounts = directory(group, &entries);

        let totals = validate_entries(group, &entries, |id| {
            accounts.get(&id).copied().ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
        }).unwrap();
        prop_assert_eq!(totals.debit, total);
        prop_assert_eq!(totals.credit, total);
    }

    // =========================================================================
    // Any difference between the sides is reported as unbalanced
    // =========================================================================

    #[test]
    fn prop_unbalanced_rejected(debit in positive_amount(), credit in positive_amount()) {
        prop_assume!(debit != credit);
        let group = GroupId::new();
        let entries = vec![
            entry(AccountId::new(), debit, Decimal::ZERO),
            entry(AccountId::new(), Decimal::ZERO, credit),
        ];
        let accounts = directory(group, &entries);

        let result = validate_entries(group, &entries, |id| {
            accounts.get(&id).copied().ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
        });
        let is_unbalanced = matches!(result, Err(LedgerError::UnbalancedTransaction { .. }));
        prop_assert!(is_unbalanced);
    }

    // =========================================================================
    // Reusing an account on the opposite side fails even when balanced
    // =========================================================================

    #[test]
    fn prop_account_on_both_sides_rejected(amount in positive_amount()) {
        let group = GroupId::new();
        let x = AccountId::new();
        let y = AccountId::new();
        let entries = vec![
            entry(x, amount, Decimal::ZERO),
            entry(y, amount, Decimal::ZERO),
            entry(x, Decimal::ZERO, amount + amount),
        ];
        let accounts = directory(group, &entries);

        let result = validate_entries(group, &entries, |id| {
            accounts.get(&id).copied().ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
        });
        prop_assert!(result.is_err());
        prop_assert!(result.unwrap_err().is_invalid_transaction());
    }
}
