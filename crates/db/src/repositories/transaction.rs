//! Transaction repository: creation, entry edits, settlement attachment,
//! deletion and scoped queries.
//!
//! Entry edits of a `New` transaction are drafts and are stored as given.
//! Edits of a `Pending` transaction are validated in the same database
//! transaction that writes them, so a pending transaction is never stored
//! unbalanced.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use tally_core::ledger::{
    EntryInput, LedgerError, LedgerScope, SettlementLink, Transaction, TransactionEntry,
    TransactionFilter, TransactionState,
};
use tally_shared::types::{AccountId, GroupId, SettlementId, TransactionId};
use tracing::info;

use super::error::db_err;
use super::store::{
    account_directory, find_group, find_settlement, insert_transaction, load_transaction, lookup,
    sync_entries, transaction_row, transactions_in_scope, write_header,
};
use crate::entities::{transaction_entries, transactions};

/// Repository for transactions and their entries.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a `New` transaction in a group with the given legs.
    ///
    /// The empty transaction is saved first, which stamps today's date, then
    /// the legs are attached as a draft.
    ///
    /// # Errors
    ///
    /// - `LedgerError::GroupNotFound` if the group does not exist
    /// - entry errors (amounts, `DuplicateEntryAccount`)
    /// - `LedgerError::Database` if the insert fails
    pub async fn create(
        &self,
        group_id: GroupId,
        entries: &[EntryInput],
    ) -> Result<Transaction, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        find_group(&txn, group_id).await?;

        let mut transaction = Transaction::new(group_id);
        transaction.save(lookup(&HashMap::new()))?;
        transaction.replace_entries(entries)?;
        insert_transaction(&txn, &transaction).await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            transaction_id = %transaction.id,
            group_id = %group_id,
            entries = transaction.entries.len(),
            "Transaction created"
        );
        Ok(transaction)
    }

    /// Gets a transaction with its entries and logs.
    ///
    /// # Errors
    ///
    /// - `LedgerError::TransactionNotFound` if no such transaction exists
    /// - `LedgerError::Database` if a query fails
    pub async fn get(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        load_transaction(&self.db, id, false).await
    }

    // ========================================================================
    // Entry edits
    // ========================================================================

    /// Adds a leg for an account that has none yet.
    ///
    /// # Errors
    ///
    /// See [`Transaction::add_entry`]; validator errors for pending
    /// transactions.
    pub async fn add_entry(
        &self,
        id: TransactionId,
        input: EntryInput,
    ) -> Result<TransactionEntry, LedgerError> {
        let (_, entry) = self
            .edit(id, |t| t.add_entry(input).cloned())
            .await?;
        Ok(entry)
    }

    /// Changes the amounts of an existing leg.
    ///
    /// # Errors
    ///
    /// See [`Transaction::update_entry`]; validator errors for pending
    /// transactions.
    pub async fn update_entry(
        &self,
        id: TransactionId,
        input: EntryInput,
    ) -> Result<TransactionEntry, LedgerError> {
        let (_, entry) = self
            .edit(id, |t| t.update_entry(input).cloned())
            .await?;
        Ok(entry)
    }

    /// Removes the leg of an account.
    ///
    /// # Errors
    ///
    /// See [`Transaction::remove_entry`]; validator errors for pending
    /// transactions.
    pub async fn remove_entry(
        &self,
        id: TransactionId,
        account_id: AccountId,
    ) -> Result<TransactionEntry, LedgerError> {
        let (_, entry) = self.edit(id, |t| t.remove_entry(account_id)).await?;
        Ok(entry)
    }

    /// Replaces all legs at once.
    ///
    /// # Errors
    ///
    /// See [`Transaction::replace_entries`]; validator errors for pending
    /// transactions.
    pub async fn replace_entries(
        &self,
        id: TransactionId,
        inputs: &[EntryInput],
    ) -> Result<Transaction, LedgerError> {
        let (transaction, ()) = self.edit(id, |t| t.replace_entries(inputs)).await?;
        Ok(transaction)
    }

    async fn edit<F, R>(
        &self,
        id: TransactionId,
        change: F,
    ) -> Result<(Transaction, R), LedgerError>
    where
        F: FnOnce(&mut Transaction) -> Result<R, LedgerError> + Send,
        R: Send,
    {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut transaction = load_transaction(&txn, id, true).await?;
        let before = transaction.entries.clone();

        let out = change(&mut transaction)?;
        if transaction.state == TransactionState::Pending {
            let directory =
                account_directory(&txn, transaction.entries.iter().map(|e| e.account_id)).await?;
            transaction.save(lookup(&directory))?;
        }

        sync_entries(&txn, &before, &transaction.entries).await?;
        write_header(&txn, &transaction, transaction.state).await?;
        txn.commit().await.map_err(db_err)?;

        info!(transaction_id = %id, state = %transaction.state, "Transaction entries changed");
        Ok((transaction, out))
    }

    /// Validates and stores a transaction again: the date defaults to today
    /// and `last_modified` is refreshed.
    ///
    /// # Errors
    ///
    /// - `LedgerError::TransactionNotFound` if no such transaction exists
    /// - validator errors
    /// - `LedgerError::Database` if a write fails
    pub async fn save(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut transaction = load_transaction(&txn, id, true).await?;
        let directory =
            account_directory(&txn, transaction.entries.iter().map(|e| e.account_id)).await?;
        transaction.save(lookup(&directory))?;
        write_header(&txn, &transaction, transaction.state).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(transaction)
    }

    /// Attaches a transaction to a settlement of its group, or detaches it.
    ///
    /// # Errors
    ///
    /// - `LedgerError::TransactionNotFound` if no such transaction exists
    /// - `LedgerError::SettlementNotFound` if the settlement is not one of
    ///   the transaction's group
    /// - `LedgerError::SettlementClosed` if the current or the new settlement
    ///   is closed
    /// - `LedgerError::Database` if the update fails
    pub async fn assign_settlement(
        &self,
        id: TransactionId,
        settlement_id: Option<SettlementId>,
    ) -> Result<Transaction, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut transaction = load_transaction(&txn, id, true).await?;
        transaction.ensure_settlement_open()?;

        transaction.settlement = match settlement_id {
            None => None,
            Some(settlement_id) => {
                let settlement = find_settlement(&txn, settlement_id).await?;
                if settlement.group_id != transaction.group_id.into_inner() {
                    return Err(LedgerError::SettlementNotFound(settlement_id));
                }
                if settlement.closed {
                    return Err(LedgerError::SettlementClosed(settlement_id));
                }
                Some(SettlementLink {
                    id: settlement_id,
                    closed: false,
                })
            }
        };
        write_header(&txn, &transaction, transaction.state).await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            transaction_id = %id,
            settlement_id = ?settlement_id,
            "Transaction settlement changed"
        );
        Ok(transaction)
    }

    /// Deletes a transaction that was never submitted, with its entries.
    ///
    /// # Errors
    ///
    /// - `LedgerError::TransactionNotFound` if no such transaction exists
    /// - `LedgerError::CanOnlyDeleteNew` if the transaction left `New`
    /// - `LedgerError::Database` if the delete fails
    pub async fn delete(&self, id: TransactionId) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let row = transaction_row(&txn, id, true).await?;
        if TransactionState::from(row.state) != TransactionState::New {
            return Err(LedgerError::CanOnlyDeleteNew);
        }

        transaction_entries::Entity::delete_many()
            .filter(transaction_entries::Column::TransactionId.eq(id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        transactions::Entity::delete_by_id(id.into_inner())
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(transaction_id = %id, "Transaction deleted");
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Transactions with an entry in `scope` whose state passes `filter`,
    /// ordered by date. `New` transactions are never listed.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn list(
        &self,
        scope: LedgerScope,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        transactions_in_scope(&self.db, scope, filter).await
    }

    /// Pending, committed and rejected transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn transactions_with_rejected(
        &self,
        scope: LedgerScope,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.list(scope, TransactionFilter::WithRejected).await
    }

    /// Pending and committed transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn transactions(&self, scope: LedgerScope) -> Result<Vec<Transaction>, LedgerError> {
        self.list(scope, TransactionFilter::NotRejected).await
    }

    /// Pending transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn pending(&self, scope: LedgerScope) -> Result<Vec<Transaction>, LedgerError> {
        self.list(scope, TransactionFilter::Pending).await
    }

    /// Committed transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn committed(&self, scope: LedgerScope) -> Result<Vec<Transaction>, LedgerError> {
        self.list(scope, TransactionFilter::Committed).await
    }

    /// Rejected transactions.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn rejected(&self, scope: LedgerScope) -> Result<Vec<Transaction>, LedgerError> {
        self.list(scope, TransactionFilter::Rejected).await
    }
}
