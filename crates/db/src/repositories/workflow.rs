//! Workflow repository for transaction state transitions.
//!
//! Each transition runs in one database transaction: the row is locked, the
//! aggregate validates and flips its state, and the header is written with a
//! compare-and-set on the previous state. Of two concurrent commits or
//! rejects of the same pending transaction exactly one succeeds; the other
//! fails with `InvalidStateTransition` and writes nothing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use tally_core::ledger::balance::{BalanceBasis, signed_balance};
use tally_core::ledger::{
    LedgerError, LogType, Movement, MovementKind, Role, Transaction, TransactionLog,
};
use tally_core::notify::{Notification, Notifier};
use tally_shared::types::{AccountId, GroupId, TransactionId, UserId};
use tracing::{debug, info};

use super::convert::account_from_model;
use super::error::db_err;
use super::store::{
    account_balance, account_directory, find_account, find_group, insert_transaction,
    load_transaction, lookup, role_account, transition,
};
use crate::entities::transaction_logs;

/// Workflow repository for transaction state transitions.
#[derive(Clone)]
pub struct WorkflowRepository {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for WorkflowRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRepository")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl WorkflowRepository {
    /// Creates a new workflow repository delivering rejection notices
    /// through `notifier`.
    #[must_use]
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Submits a `New` transaction, or re-submits a `Pending` one.
    ///
    /// # Errors
    ///
    /// - `LedgerError::TransactionNotFound` / `UserNotFound`
    /// - `LedgerError::InvalidStateTransition` from any other state
    /// - `LedgerError::SettlementClosed` if its settlement is closed
    /// - validator errors
    pub async fn set_pending(
        &self,
        id: TransactionId,
        actor: UserId,
        message: Option<&str>,
    ) -> Result<TransactionLog, LedgerError> {
        self.step(id, LogType::Pending, actor, message).await
    }

    /// Commits a `Pending` transaction. Its entries count towards confirmed
    /// balances from now on.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_pending`], plus `LedgerError::DuplicateLog`.
    pub async fn set_committed(
        &self,
        id: TransactionId,
        actor: UserId,
        message: Option<&str>,
    ) -> Result<TransactionLog, LedgerError> {
        self.step(id, LogType::Committed, actor, message).await
    }

    /// Rejects a `Pending` transaction and notifies the owners of the member
    /// accounts it touches once the rejection is stored.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_committed`].
    pub async fn set_rejected(
        &self,
        id: TransactionId,
        actor: UserId,
        message: Option<&str>,
    ) -> Result<TransactionLog, LedgerError> {
        self.step(id, LogType::Rejected, actor, message).await
    }

    /// Stores a log record built by the caller by running the transition of
    /// its type. The stored record gets a fresh ID and timestamp.
    ///
    /// # Errors
    ///
    /// - `LedgerError::LogImmutable` if a record with this ID already exists
    /// - errors of the matching transition
    pub async fn save_log(&self, log: &TransactionLog) -> Result<TransactionLog, LedgerError> {
        let existing = transaction_logs::Entity::find_by_id(log.id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(LedgerError::LogImmutable(log.id));
        }
        self.step(log.transaction_id, log.log_type, log.actor, log.message.as_deref())
            .await
    }

    async fn step(
        &self,
        id: TransactionId,
        log_type: LogType,
        actor: UserId,
        message: Option<&str>,
    ) -> Result<TransactionLog, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let mut transaction = load_transaction(&txn, id, true).await?;
        let log = transition(&txn, &mut transaction, log_type, actor, message).await?;

        let notices = if log_type == LogType::Rejected {
            let directory =
                account_directory(&txn, transaction.entries.iter().map(|e| e.account_id)).await?;
            Notification::rejections(&transaction.affected_owners(lookup(&directory))?)
        } else {
            Vec::new()
        };
        txn.commit().await.map_err(db_err)?;

        for notice in &notices {
            debug!(transaction_id = %id, user = %notice.user, "Sending rejection notice");
            self.notifier.notify(notice);
        }
        Ok(log)
    }

    /// Books a deposit, withdrawal or transfer and submits it.
    ///
    /// Deposits and withdrawals go against the group's bank account and stay
    /// pending. A transfer is committed at once when the source's signed
    /// balance covers the amount.
    ///
    /// # Errors
    ///
    /// - `LedgerError::GroupNotFound` / `AccountNotFound` / `UserNotFound`
    /// - `LedgerError::RoleAccountNotFound` if the group has no bank account
    /// - validator errors
    pub async fn submit_movement(
        &self,
        group_id: GroupId,
        movement: &Movement,
        actor: UserId,
    ) -> Result<Transaction, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        find_group(&txn, group_id).await?;

        let bank = if movement.needs_bank_account() {
            AccountId::from(role_account(&txn, group_id, Role::Bank).await?.id)
        } else {
            movement.account_id
        };

        let mut transaction = Transaction::new(group_id);
        transaction.save(lookup(&HashMap::new()))?;
        transaction.replace_entries(&movement.legs(bank))?;
        insert_transaction(&txn, &transaction).await?;
        transition(
            &txn,
            &mut transaction,
            LogType::Pending,
            actor,
            movement.details.as_deref(),
        )
        .await?;

        if let MovementKind::Transfer { .. } = movement.kind {
            let source = account_from_model(find_account(&txn, movement.account_id).await?);
            let balance =
                account_balance(&txn, source.id, BalanceBasis::Confirmed, None).await?;
            if movement.auto_commits(signed_balance(&source, balance)) {
                transition(&txn, &mut transaction, LogType::Committed, actor, None).await?;
            }
        }
        txn.commit().await.map_err(db_err)?;

        info!(
            transaction_id = %transaction.id,
            group_id = %group_id,
            kind = ?movement.kind,
            amount = %movement.amount,
            state = %transaction.state,
            "Movement submitted"
        );
        Ok(transaction)
    }
}
