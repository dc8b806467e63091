//! Property-based tests for balance calculations.

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, GroupId, UserId};
use uuid::Uuid;

use super::balance::{
    BalanceBasis, LedgerLine, balance, fold_balances, is_blocked, needs_warning, signed_balance,
};
use super::group::{Account, BalanceLimits};
use super::types::{AccountType, TransactionState};

/// Strategy for an amount from 0.00 to 10,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_state() -> impl Strategy<Value = TransactionState> {
    prop_oneof![
        Just(TransactionState::New),
        Just(TransactionState::Pending),
        Just(TransactionState::Committed),
        Just(TransactionState::Rejected),
    ]
}

/// Lines spread over a small fixed set of accounts.
fn arb_lines() -> impl Strategy<Value = (Vec<AccountId>, Vec<LedgerLine>)> {
    let accounts: Vec<AccountId> = (1..=4u128)
        .map(|n| AccountId::from_uuid(Uuid::from_u128(n)))
        .collect();
    let picks = accounts.clone();
    let lines = prop::collection::vec((0usize..4, arb_state(), amount(), amount()), 0..40)
        .prop_map(move |raw| {
            raw.into_iter()
                .map(|(i, state, debit, credit)| LedgerLine {
                    account_id: picks[i],
                    date: None,
                    state,
                    debit,
                    credit,
                })
                .collect::<Vec<_>>()
        });
    (Just(accounts), lines)
}

fn account(group_account: bool, ignore_block_limit: bool) -> Account {
    Account {
        id: AccountId::new(),
        group_id: GroupId::new(),
        name: "member".to_string(),
        short_name: "member".to_string(),
        slug: "member".to_string(),
        account_type: AccountType::Liability,
        owner: (!group_account).then(UserId::new),
        active: true,
        blocked: false,
        ignore_block_limit,
        group_account,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // The bulk path agrees with per-account balances
    // =========================================================================

    #[test]
    fn prop_fold_matches_single_balance((accounts, lines) in arb_lines()) {
        for basis in [BalanceBasis::Confirmed, BalanceBasis::Future] {
            let folded = fold_balances(&lines, basis, None);
            for id in &accounts {
                let single = balance(&lines, *id, basis, None);
                prop_assert_eq!(folded.get(id).copied().unwrap_or_default(), single);
            }
        }
    }

    // =========================================================================
    // Future balance = confirmed balance + pending lines
    // =========================================================================

    #[test]
    fn prop_future_adds_pending((accounts, lines) in arb_lines()) {
        for id in &accounts {
            let pending: Decimal = lines
                .iter()
                .filter(|l| l.account_id == *id && l.state == TransactionState::Pending)
                .map(|l| l.debit - l.credit)
                .sum();
            prop_assert_eq!(
                balance(&lines, *id, BalanceBasis::Future, None),
                balance(&lines, *id, BalanceBasis::Confirmed, None) + pending
            );
        }
    }

    // =========================================================================
    // Signed balance only flips the sign of member accounts
    // =========================================================================

    #[test]
    fn prop_signed_balance_magnitude(cents in -1_000_000i64..1_000_000i64, group in any::<bool>()) {
        let raw = Decimal::new(cents, 2);
        let acc = account(group, false);
        let signed = signed_balance(&acc, raw);
        prop_assert_eq!(signed.abs(), raw.abs());
        if group || raw.is_zero() {
            prop_assert_eq!(signed, raw);
        } else {
            prop_assert_eq!(signed, -raw);
        }
    }

    // =========================================================================
    // Exempt accounts are never limited
    // =========================================================================

    #[test]
    fn prop_exempt_accounts_never_limited(
        cents in -1_000_000i64..1_000_000i64,
        warn in -1000i64..1000,
        block in -1000i64..1000,
        group in any::<bool>(),
    ) {
        let limits = BalanceLimits { warn_limit: Some(warn), block_limit: Some(block) };
        let acc = if group { account(true, false) } else { account(false, true) };
        let signed = Decimal::new(cents, 2);
        prop_assert!(!is_blocked(&acc, &limits, signed));
        prop_assert!(!needs_warning(&acc, &limits, signed));
    }

    #[test]
    fn prop_block_iff_below_limit(cents in -1_000_000i64..1_000_000i64, block in -1000i64..1000) {
        let limits = BalanceLimits { warn_limit: None, block_limit: Some(block) };
        let signed = Decimal::new(cents, 2);
        prop_assert_eq!(
            is_blocked(&account(false, false), &limits, signed),
            signed < Decimal::from(block)
        );
    }
}
