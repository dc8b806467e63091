//! Transaction aggregate.
//!
//! A [`Transaction`] owns its entries and its audit log. All mutations go
//! through methods that enforce the entry rules, the validator and the
//! state machine, so a loaded aggregate can be changed in memory and then
//! written back inside a single database transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, GroupId, SettlementId, TransactionId, UserId};

use super::entry::{EntryInput, TransactionEntry};
use super::error::LedgerError;
use super::log::{TransactionLog, ensure_appendable};
use super::types::{LogType, TransactionState};
use super::validation::{AccountInfo, TransactionTotals, validate_entries};
use crate::workflow::{WorkflowAction, WorkflowService};

/// The settlement a transaction is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLink {
    /// Settlement ID.
    pub id: SettlementId,
    /// Whether the settlement is closed.
    pub closed: bool,
}

/// A balanced movement of money between accounts of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Owning group.
    pub group_id: GroupId,
    /// Settlement the transaction is part of.
    pub settlement: Option<SettlementLink>,
    /// Booking date, defaulted to today on first save.
    pub date: Option<NaiveDate>,
    /// Refreshed on every save.
    pub last_modified: DateTime<Utc>,
    /// Workflow state.
    pub state: TransactionState,
    /// The legs of the transaction.
    pub entries: Vec<TransactionEntry>,
    /// Audit records, oldest first.
    pub logs: Vec<TransactionLog>,
}

impl Transaction {
    /// Creates an empty transaction in the `New` state.
    #[must_use]
    pub fn new(group_id: GroupId) -> Self {
        Self {
            id: TransactionId::new(),
            group_id,
            settlement: None,
            date: None,
            last_modified: Utc::now(),
            state: TransactionState::New,
            entries: Vec::new(),
            logs: Vec::new(),
        }
    }

    // ========================================================================
    // State queries
    // ========================================================================

    /// Returns true if the transaction is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == TransactionState::Pending
    }

    /// Returns true if the transaction is committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.state == TransactionState::Committed
    }

    /// Returns true if the transaction is rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state == TransactionState::Rejected
    }

    /// Returns true if the transaction was ever submitted.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.latest_log(LogType::Pending).is_some()
    }

    /// Returns true if the transaction was ever committed.
    #[must_use]
    pub fn has_committed(&self) -> bool {
        self.latest_log(LogType::Committed).is_some()
    }

    /// Returns true if the transaction was ever rejected.
    #[must_use]
    pub fn has_rejected(&self) -> bool {
        self.latest_log(LogType::Rejected).is_some()
    }

    /// Returns the most recent log record of `log_type`.
    #[must_use]
    pub fn latest_log(&self, log_type: LogType) -> Option<&TransactionLog> {
        self.logs
            .iter()
            .filter(|log| log.log_type == log_type)
            .max_by_key(|log| (log.timestamp, log.id))
    }

    /// Returns the states this transaction may move to next.
    #[must_use]
    pub const fn valid_next_states(&self) -> &'static [TransactionState] {
        self.state.next_states()
    }

    /// Returns the debit and credit totals of the current entries.
    #[must_use]
    pub fn totals(&self) -> TransactionTotals {
        TransactionTotals::of(&self.entries)
    }

    /// Returns the entry posting to `account_id`, if any.
    #[must_use]
    pub fn entry(&self, account_id: AccountId) -> Option<&TransactionEntry> {
        self.entries.iter().find(|e| e.account_id == account_id)
    }

    // ========================================================================
    // Entry mutation
    // ========================================================================

    /// Fails unless the transaction's settlement is open.
    ///
    /// # Errors
    ///
    /// `LedgerError::SettlementClosed` if attached to a closed settlement.
    pub fn ensure_settlement_open(&self) -> Result<(), LedgerError> {
        match self.settlement {
            Some(SettlementLink { id, closed: true }) => Err(LedgerError::SettlementClosed(id)),
            _ => Ok(()),
        }
    }

    /// Fails unless entries may still change.
    ///
    /// # Errors
    ///
    /// - `LedgerError::SettlementClosed` if attached to a closed settlement
    /// - `LedgerError::TransactionFrozen` if committed or rejected
    pub fn ensure_editable(&self) -> Result<(), LedgerError> {
        self.ensure_settlement_open()?;
        if self.state.is_frozen() {
            return Err(LedgerError::TransactionFrozen(self.state));
        }
        Ok(())
    }

    /// Adds a leg for an account that has none yet.
    ///
    /// # Errors
    ///
    /// - errors of [`Self::ensure_editable`]
    /// - entry amount errors
    /// - `LedgerError::DuplicateEntryAccount` if the account already has a leg
    pub fn add_entry(&mut self, input: EntryInput) -> Result<&TransactionEntry, LedgerError> {
        self.ensure_editable()?;
        if self.entry(input.account_id).is_some() {
            return Err(LedgerError::DuplicateEntryAccount(input.account_id));
        }
        let entry = TransactionEntry::new(self.id, input.account_id, input.debit, input.credit)?;
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// Changes the amounts of an existing leg.
    ///
    /// # Errors
    ///
    /// - errors of [`Self::ensure_editable`]
    /// - entry amount errors
    /// - `LedgerError::EntryNotFound` if the account has no leg
    pub fn update_entry(&mut self, input: EntryInput) -> Result<&TransactionEntry, LedgerError> {
        self.ensure_editable()?;
        super::entry::validate_amounts(input.debit, input.credit)?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.account_id == input.account_id)
            .ok_or(LedgerError::EntryNotFound(input.account_id))?;
        entry.debit = input.debit;
        entry.credit = input.credit;
        Ok(entry)
    }

    /// Removes the leg of an account.
    ///
    /// # Errors
    ///
    /// - errors of [`Self::ensure_editable`]
    /// - `LedgerError::EntryNotFound` if the account has no leg
    pub fn remove_entry(&mut self, account_id: AccountId) -> Result<TransactionEntry, LedgerError> {
        self.ensure_editable()?;
        let index = self
            .entries
            .iter()
            .position(|e| e.account_id == account_id)
            .ok_or(LedgerError::EntryNotFound(account_id))?;
        Ok(self.entries.remove(index))
    }

    /// Replaces all legs at once. On error the entries are left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_entry`] for any of the inputs.
    pub fn replace_entries(&mut self, inputs: &[EntryInput]) -> Result<(), LedgerError> {
        self.ensure_editable()?;
        let mut entries: Vec<TransactionEntry> = Vec::with_capacity(inputs.len());
        for input in inputs {
            if entries.iter().any(|e| e.account_id == input.account_id) {
                return Err(LedgerError::DuplicateEntryAccount(input.account_id));
            }
            entries.push(TransactionEntry::new(
                self.id,
                input.account_id,
                input.debit,
                input.credit,
            )?);
        }
        self.entries = entries;
        Ok(())
    }

    // ========================================================================
    // Save path
    // ========================================================================

    /// Runs the validator over the current entries.
    ///
    /// # Errors
    ///
    /// See [`validate_entries`].
    pub fn validate<A>(&self, account_lookup: A) -> Result<TransactionTotals, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        validate_entries(self.group_id, &self.entries, account_lookup)
    }

    /// Validates and stamps the transaction as it is persisted: an unset date
    /// becomes today, and `last_modified` becomes now.
    ///
    /// # Errors
    ///
    /// See [`validate_entries`].
    pub fn save<A>(&mut self, account_lookup: A) -> Result<TransactionTotals, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        let totals = self.validate(account_lookup)?;
        self.touch(Utc::now());
        Ok(totals)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        if self.date.is_none() {
            self.date = Some(now.date_naive());
        }
        self.last_modified = now;
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    /// Submits the transaction.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub fn set_pending<A>(
        &mut self,
        actor: UserId,
        message: Option<&str>,
        account_lookup: A,
    ) -> Result<TransactionLog, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        let action = WorkflowService::set_pending(self.state, actor, message)?;
        self.apply(action, account_lookup)
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub fn set_committed<A>(
        &mut self,
        actor: UserId,
        message: Option<&str>,
        account_lookup: A,
    ) -> Result<TransactionLog, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        let action = WorkflowService::set_committed(self.state, actor, message)?;
        self.apply(action, account_lookup)
    }

    /// Rejects the transaction.
    ///
    /// Notifying the owners of the affected accounts is left to the caller,
    /// see [`Self::affected_owners`].
    ///
    /// # Errors
    ///
    /// See [`Self::apply`].
    pub fn set_rejected<A>(
        &mut self,
        actor: UserId,
        message: Option<&str>,
        account_lookup: A,
    ) -> Result<TransactionLog, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        let action = WorkflowService::set_rejected(self.state, actor, message)?;
        self.apply(action, account_lookup)
    }

    /// Applies a workflow action: validates the entries, appends the log
    /// record and flips the state. Nothing changes if any step fails.
    ///
    /// # Errors
    ///
    /// - `LedgerError::SettlementClosed` if attached to a closed settlement
    /// - `LedgerError::InvalidStateTransition` if the action was computed
    ///   for another state than the current one
    /// - validator errors
    /// - log errors (`DuplicateLog`)
    pub fn apply<A>(
        &mut self,
        action: WorkflowAction,
        account_lookup: A,
    ) -> Result<TransactionLog, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        self.ensure_settlement_open()?;
        if action.from != self.state || !self.state.can_transition_to(action.new_state) {
            return Err(LedgerError::InvalidStateTransition {
                from: self.state,
                to: action.new_state,
            });
        }
        self.validate(account_lookup)?;

        let log = action.to_log(self.id);
        ensure_appendable(&self.logs, &log)?;

        self.state = action.new_state;
        self.touch(action.at);
        self.logs.push(log.clone());
        Ok(log)
    }

    /// Appends an externally built log record, enforcing the log rules.
    ///
    /// # Errors
    ///
    /// - `LedgerError::LogImmutable` if the record was already appended
    /// - `LedgerError::DuplicateLog` if its unique type is already recorded
    pub fn append_log(&mut self, log: TransactionLog) -> Result<(), LedgerError> {
        ensure_appendable(&self.logs, &log)?;
        self.logs.push(log);
        Ok(())
    }

    /// Returns the owners of the member accounts this transaction touches,
    /// each once, in entry order.
    ///
    /// # Errors
    ///
    /// Errors from `account_lookup`.
    pub fn affected_owners<A>(&self, account_lookup: A) -> Result<Vec<UserId>, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        let mut owners = Vec::new();
        for entry in &self.entries {
            let account = account_lookup(entry.account_id)?;
            if account.group_account {
                continue;
            }
            if let Some(owner) = account.owner
                && !owners.contains(&owner)
            {
                owners.push(owner);
            }
        }
        Ok(owners)
    }
}
