//! Ledger domain enums and query selectors.
//!
//! The string forms returned by `as_str` are the values persisted by the
//! store, so they must stay stable.

use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::{AccountId, GroupId};

/// Account type classification.
///
/// Member accounts are liabilities of the group: money paid in by a member is
/// owed back to them, so member accounts grow on the credit side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Asset account (bank, cash).
    Asset,
    /// Liability account (member accounts).
    Liability,
    /// Equity account.
    Equity,
    /// Income account.
    Income,
    /// Expense account.
    Expense,
}

impl AccountType {
    /// Returns the string representation of the account type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Parses an account type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Some(Self::Asset),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational role a group account can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The group's bank account.
    Bank,
    /// The group's cash box.
    Cash,
    /// Sales income account.
    Sale,
}

impl Role {
    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::Sale => "sale",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bank" => Some(Self::Bank),
            "cash" => Some(Self::Cash),
            "sale" => Some(Self::Sale),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction state in the approval workflow.
///
/// The valid transitions are:
/// - New → Pending
/// - Pending → Pending (re-submission)
/// - Pending → Committed
/// - Pending → Rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    /// Created but never submitted. Not surfaced by transaction queries.
    New,
    /// Submitted and awaiting a decision. Entries may still change.
    Pending,
    /// Counted in balances. Terminal.
    Committed,
    /// Declined. Terminal.
    Rejected,
}

impl TransactionState {
    /// Returns the string representation of the state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(Self::New),
            "pending" => Some(Self::Pending),
            "committed" => Some(Self::Committed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if entries can no longer change.
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        matches!(self, Self::Committed | Self::Rejected)
    }

    /// Returns the states reachable from this one in a single transition.
    #[must_use]
    pub const fn next_states(&self) -> &'static [TransactionState] {
        match self {
            Self::New => &[Self::Pending],
            Self::Pending => &[Self::Pending, Self::Committed, Self::Rejected],
            Self::Committed | Self::Rejected => &[],
        }
    }

    /// Returns true if `next` is reachable from this state.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        self.next_states().contains(&next)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an audit log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    /// The transaction was (re-)submitted.
    Pending,
    /// The transaction was committed.
    Committed,
    /// The transaction was rejected.
    Rejected,
}

impl LogType {
    /// Returns the string representation of the log type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a log type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "committed" => Some(Self::Committed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if a transaction may carry at most one record of this type.
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns the state a transaction is in after a record of this type.
    #[must_use]
    pub const fn resulting_state(&self) -> TransactionState {
        match self {
            Self::Pending => TransactionState::Pending,
            Self::Committed => TransactionState::Committed,
            Self::Rejected => TransactionState::Rejected,
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a transaction query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerScope {
    /// Transactions with an entry on any account of the group.
    Group(GroupId),
    /// Transactions with an entry on the account.
    Account(AccountId),
}

/// State filter of a transaction query.
///
/// Every filter excludes `New` transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionFilter {
    /// Pending, committed and rejected.
    WithRejected,
    /// Pending and committed.
    NotRejected,
    /// Pending only.
    Pending,
    /// Committed only.
    Committed,
    /// Rejected only.
    Rejected,
}

impl TransactionFilter {
    /// Returns the states selected by this filter.
    #[must_use]
    pub const fn states(&self) -> &'static [TransactionState] {
        match self {
            Self::WithRejected => &[
                TransactionState::Pending,
                TransactionState::Committed,
                TransactionState::Rejected,
            ],
            Self::NotRejected => &[TransactionState::Pending, TransactionState::Committed],
            Self::Pending => &[TransactionState::Pending],
            Self::Committed => &[TransactionState::Committed],
            Self::Rejected => &[TransactionState::Rejected],
        }
    }

    /// Returns true if a transaction in `state` is selected.
    #[must_use]
    pub fn matches(&self, state: TransactionState) -> bool {
        self.states().contains(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TransactionState::New)]
    #[case(TransactionState::Pending)]
    #[case(TransactionState::Committed)]
    #[case(TransactionState::Rejected)]
    fn test_state_round_trips_through_str(#[case] state: TransactionState) {
        assert_eq!(TransactionState::parse(state.as_str()), Some(state));
        assert_eq!(state.to_string(), state.as_str());
    }

    #[test]
    fn test_state_parse_unknown() {
        assert_eq!(TransactionState::parse("posted"), None);
        assert_eq!(AccountType::parse("LIABILITY"), Some(AccountType::Liability));
        assert_eq!(Role::parse("till"), None);
    }

    #[test]
    fn test_next_states() {
        assert_eq!(
            TransactionState::New.next_states(),
            &[TransactionState::Pending]
        );
        assert!(TransactionState::Pending.can_transition_to(TransactionState::Pending));
        assert!(TransactionState::Pending.can_transition_to(TransactionState::Committed));
        assert!(TransactionState::Pending.can_transition_to(TransactionState::Rejected));
        assert!(TransactionState::Committed.next_states().is_empty());
        assert!(TransactionState::Rejected.next_states().is_empty());
        assert!(!TransactionState::New.can_transition_to(TransactionState::Committed));
    }

    #[test]
    fn test_frozen_states() {
        assert!(!TransactionState::New.is_frozen());
        assert!(!TransactionState::Pending.is_frozen());
        assert!(TransactionState::Committed.is_frozen());
        assert!(TransactionState::Rejected.is_frozen());
    }

    #[test]
    fn test_log_type_uniqueness() {
        assert!(!LogType::Pending.is_unique());
        assert!(LogType::Committed.is_unique());
        assert!(LogType::Rejected.is_unique());
        assert_eq!(
            LogType::Rejected.resulting_state(),
            TransactionState::Rejected
        );
    }

    #[rstest]
    #[case(TransactionFilter::WithRejected, TransactionState::New, false)]
    #[case(TransactionFilter::WithRejected, TransactionState::Rejected, true)]
    #[case(TransactionFilter::NotRejected, TransactionState::Rejected, false)]
    #[case(TransactionFilter::NotRejected, TransactionState::Pending, true)]
    #[case(TransactionFilter::Committed, TransactionState::Pending, false)]
    #[case(TransactionFilter::Pending, TransactionState::New, false)]
    fn test_filter_matches(
        #[case] filter: TransactionFilter,
        #[case] state: TransactionState,
        #[case] expected: bool,
    ) {
        assert_eq!(filter.matches(state), expected);
    }
}
