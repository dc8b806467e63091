//! Account balance calculations.
//!
//! Balances are computed from [`LedgerLine`]s, the flattened view of an
//! entry together with the state and date of its transaction. The store
//! loads the lines (one query for a whole group on the bulk path) and the
//! functions here do the arithmetic and the limit checks.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;

use super::group::{Account, BalanceLimits};
use super::types::TransactionState;

/// Which transactions count towards a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceBasis {
    /// Committed transactions only.
    Confirmed,
    /// Committed and pending transactions, i.e. the balance once every
    /// pending transaction is committed.
    Future,
}

impl BalanceBasis {
    /// Returns true if transactions in `state` count towards this basis.
    #[must_use]
    pub const fn includes(self, state: TransactionState) -> bool {
        match self {
            Self::Confirmed => matches!(state, TransactionState::Committed),
            Self::Future => matches!(
                state,
                TransactionState::Committed | TransactionState::Pending
            ),
        }
    }

    /// Transaction states counted by this basis.
    #[must_use]
    pub const fn states(self) -> &'static [TransactionState] {
        match self {
            Self::Confirmed => &[TransactionState::Committed],
            Self::Future => &[TransactionState::Committed, TransactionState::Pending],
        }
    }
}

/// One entry as seen by the balance engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    /// The account the entry posts to.
    pub account_id: AccountId,
    /// Date of the owning transaction.
    pub date: Option<NaiveDate>,
    /// State of the owning transaction.
    pub state: TransactionState,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

impl LedgerLine {
    /// Returns true if the line counts for `basis` as of `as_of`.
    ///
    /// With an `as_of` date, lines of undated transactions never count.
    #[must_use]
    pub fn counts(&self, basis: BalanceBasis, as_of: Option<NaiveDate>) -> bool {
        if !basis.includes(self.state) {
            return false;
        }
        match as_of {
            Some(cutoff) => self.date.is_some_and(|date| date <= cutoff),
            None => true,
        }
    }
}

/// Sums `debit - credit` over the lines of `account_id` that count.
#[must_use]
pub fn balance(
    lines: &[LedgerLine],
    account_id: AccountId,
    basis: BalanceBasis,
    as_of: Option<NaiveDate>,
) -> Decimal {
    lines
        .iter()
        .filter(|line| line.account_id == account_id && line.counts(basis, as_of))
        .map(|line| line.debit - line.credit)
        .sum()
}

/// Folds lines of many accounts into one balance per account.
///
/// Accounts without counting lines are absent from the result; callers
/// treat a missing account as zero.
#[must_use]
pub fn fold_balances<'a, I>(
    lines: I,
    basis: BalanceBasis,
    as_of: Option<NaiveDate>,
) -> HashMap<AccountId, Decimal>
where
    I: IntoIterator<Item = &'a LedgerLine>,
{
    let mut balances: HashMap<AccountId, Decimal> = HashMap::new();
    for line in lines {
        if line.counts(basis, as_of) {
            *balances.entry(line.account_id).or_default() += line.debit - line.credit;
        }
    }
    balances
}

/// Returns the balance as members read it.
///
/// Member accounts are liabilities of the group, so their raw balance is
/// negated; group accounts keep theirs. Zero stays zero.
#[must_use]
pub fn signed_balance(account: &Account, balance: Decimal) -> Decimal {
    if account.group_account || balance.is_zero() {
        balance
    } else {
        -balance
    }
}

/// Returns true if the account must not take part in new movements.
///
/// A manual block always wins. Otherwise only member accounts that do not
/// ignore limits are checked, against the group's block limit.
#[must_use]
pub fn is_blocked(account: &Account, limits: &BalanceLimits, signed_balance: Decimal) -> bool {
    if account.blocked {
        return true;
    }
    below_limit(account, limits.block_limit, signed_balance)
}

/// Returns true if the account's signed balance is under the warn limit.
///
/// The manual block flag plays no part here.
#[must_use]
pub fn needs_warning(account: &Account, limits: &BalanceLimits, signed_balance: Decimal) -> bool {
    below_limit(account, limits.warn_limit, signed_balance)
}

fn below_limit(account: &Account, limit: Option<i64>, signed_balance: Decimal) -> bool {
    if account.group_account || account.ignore_block_limit {
        return false;
    }
    limit.is_some_and(|limit| signed_balance < Decimal::from(limit))
}

/// Balance and derived status of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStanding {
    /// The account ID.
    pub account_id: AccountId,
    /// Raw balance (`debit - credit`).
    pub balance: Decimal,
    /// Balance as members read it.
    pub signed_balance: Decimal,
    /// See [`is_blocked`].
    pub blocked: bool,
    /// See [`needs_warning`].
    pub needs_warning: bool,
}

impl AccountStanding {
    /// Derives the standing of `account` from its raw balance.
    #[must_use]
    pub fn evaluate(account: &Account, limits: &BalanceLimits, balance: Decimal) -> Self {
        let signed = signed_balance(account, balance);
        Self {
            account_id: account.id,
            balance,
            signed_balance: signed,
            blocked: is_blocked(account, limits, signed),
            needs_warning: needs_warning(account, limits, signed),
        }
    }
}

/// Evaluates every account against a precomputed balance map.
#[must_use]
pub fn evaluate_standings(
    accounts: &[Account],
    limits: &BalanceLimits,
    balances: &HashMap<AccountId, Decimal>,
) -> Vec<AccountStanding> {
    accounts
        .iter()
        .map(|account| {
            let balance = balances.get(&account.id).copied().unwrap_or_default();
            AccountStanding::evaluate(account, limits, balance)
        })
        .collect()
}
