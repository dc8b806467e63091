//! Queries and writes shared by the repositories.
//!
//! Every function takes any `ConnectionTrait`, so the same code runs on the
//! pool or inside a database transaction. A caller holding a transaction must
//! pass the transaction, never the pool.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tally_core::ledger::balance::{self, BalanceBasis, LedgerLine};
use tally_core::ledger::entry::from_minor_units;
use tally_core::ledger::{
    AccountInfo, LedgerError, LedgerScope, LogType, Role, SettlementLink, Transaction,
    TransactionEntry, TransactionFilter, TransactionLog, TransactionState,
};
use tally_shared::types::{AccountId, GroupId, SettlementId, TransactionId, UserId};
use tracing::info;
use uuid::Uuid;

use super::convert::{
    account_info, entry_active_model, entry_from_model, log_active_model, log_from_model,
};
use super::error::db_err;
use crate::entities::{
    accounts, groups, role_accounts, sea_orm_active_enums as enums, settlements,
    transaction_entries, transaction_logs, transactions, users,
};

// ============================================================================
// Existence checks
// ============================================================================

pub(crate) async fn find_group<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> Result<groups::Model, LedgerError> {
    groups::Entity::find_by_id(group_id.into_inner())
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::GroupNotFound(group_id.to_string()))
}

pub(crate) async fn find_user<C: ConnectionTrait>(
    conn: &C,
    user_id: UserId,
) -> Result<users::Model, LedgerError> {
    users::Entity::find_by_id(user_id.into_inner())
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::UserNotFound(user_id.to_string()))
}

pub(crate) async fn find_account<C: ConnectionTrait>(
    conn: &C,
    account_id: AccountId,
) -> Result<accounts::Model, LedgerError> {
    accounts::Entity::find_by_id(account_id.into_inner())
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
}

pub(crate) async fn find_settlement<C: ConnectionTrait>(
    conn: &C,
    settlement_id: SettlementId,
) -> Result<settlements::Model, LedgerError> {
    settlements::Entity::find_by_id(settlement_id.into_inner())
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::SettlementNotFound(settlement_id))
}

/// Resolves the account bound to `role` in a group.
pub(crate) async fn role_account<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    role: Role,
) -> Result<accounts::Model, LedgerError> {
    let binding = role_accounts::Entity::find()
        .filter(role_accounts::Column::GroupId.eq(group_id.into_inner()))
        .filter(role_accounts::Column::Role.eq(enums::Role::from(role)))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::RoleAccountNotFound { group_id, role })?;
    find_account(conn, AccountId::from(binding.account_id)).await
}

// ============================================================================
// Account directory for the validator
// ============================================================================

/// Loads the validation view of the given accounts in one query.
pub(crate) async fn account_directory<C, I>(
    conn: &C,
    account_ids: I,
) -> Result<HashMap<AccountId, AccountInfo>, LedgerError>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = AccountId>,
{
    let ids: HashSet<Uuid> = account_ids.into_iter().map(AccountId::into_inner).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let models = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(ids))
        .all(conn)
        .await
        .map_err(db_err)?;
    Ok(models
        .iter()
        .map(|model| (AccountId::from(model.id), account_info(model)))
        .collect())
}

/// Turns a loaded directory into the lookup the validator expects.
pub(crate) fn lookup(
    directory: &HashMap<AccountId, AccountInfo>,
) -> impl Fn(AccountId) -> Result<AccountInfo, LedgerError> + '_ {
    move |id| {
        directory
            .get(&id)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }
}

// ============================================================================
// Transaction aggregate loading
// ============================================================================

/// Fetches a transaction row, locking it for update when `lock` is set.
pub(crate) async fn transaction_row<C: ConnectionTrait>(
    conn: &C,
    transaction_id: TransactionId,
    lock: bool,
) -> Result<transactions::Model, LedgerError> {
    let mut query = transactions::Entity::find_by_id(transaction_id.into_inner());
    if lock {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::TransactionNotFound(transaction_id))
}

/// Loads a transaction with its entries, logs and settlement link.
pub(crate) async fn load_transaction<C: ConnectionTrait>(
    conn: &C,
    transaction_id: TransactionId,
    lock: bool,
) -> Result<Transaction, LedgerError> {
    let row = transaction_row(conn, transaction_id, lock).await?;
    hydrate(conn, vec![row])
        .await?
        .pop()
        .ok_or(LedgerError::TransactionNotFound(transaction_id))
}

/// Builds aggregates for `rows`, loading entries, logs and settlements in
/// one query each. The order of `rows` is kept.
pub(crate) async fn hydrate<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<transactions::Model>,
) -> Result<Vec<Transaction>, LedgerError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let settlement_ids: HashSet<Uuid> = rows.iter().filter_map(|row| row.settlement_id).collect();

    let mut entries: HashMap<Uuid, Vec<TransactionEntry>> = HashMap::new();
    for model in transaction_entries::Entity::find()
        .filter(transaction_entries::Column::TransactionId.is_in(ids.clone()))
        .order_by_asc(transaction_entries::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?
    {
        entries
            .entry(model.transaction_id)
            .or_default()
            .push(entry_from_model(model));
    }

    let mut logs: HashMap<Uuid, Vec<TransactionLog>> = HashMap::new();
    for model in transaction_logs::Entity::find()
        .filter(transaction_logs::Column::TransactionId.is_in(ids))
        .order_by_asc(transaction_logs::Column::Timestamp)
        .order_by_asc(transaction_logs::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?
    {
        logs.entry(model.transaction_id)
            .or_default()
            .push(log_from_model(model));
    }

    let closed: HashMap<Uuid, bool> = if settlement_ids.is_empty() {
        HashMap::new()
    } else {
        settlements::Entity::find()
            .filter(settlements::Column::Id.is_in(settlement_ids))
            .all(conn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|settlement| (settlement.id, settlement.closed))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|row| Transaction {
            id: TransactionId::from(row.id),
            group_id: GroupId::from(row.group_id),
            settlement: row.settlement_id.map(|id| SettlementLink {
                id: SettlementId::from(id),
                closed: closed.get(&id).copied().unwrap_or(false),
            }),
            date: row.date,
            last_modified: row.last_modified,
            state: row.state.into(),
            entries: entries.remove(&row.id).unwrap_or_default(),
            logs: logs.remove(&row.id).unwrap_or_default(),
        })
        .collect())
}

// ============================================================================
// Transaction writes
// ============================================================================

/// Inserts a new transaction row and its entries.
pub(crate) async fn insert_transaction<C: ConnectionTrait>(
    conn: &C,
    transaction: &Transaction,
) -> Result<(), LedgerError> {
    transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        group_id: Set(transaction.group_id.into_inner()),
        settlement_id: Set(transaction.settlement.map(|link| link.id.into_inner())),
        date: Set(transaction.date),
        last_modified: Set(transaction.last_modified),
        state: Set(transaction.state.into()),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    for entry in &transaction.entries {
        entry_active_model(entry)?
            .insert(conn)
            .await
            .map_err(db_err)?;
    }
    Ok(())
}

/// Writes the difference between two versions of a transaction's entries.
///
/// Removed rows are deleted first so a replaced leg for the same account
/// never collides with the old one.
pub(crate) async fn sync_entries<C: ConnectionTrait>(
    conn: &C,
    before: &[TransactionEntry],
    after: &[TransactionEntry],
) -> Result<(), LedgerError> {
    let removed: Vec<Uuid> = before
        .iter()
        .filter(|old| !after.iter().any(|new| new.id == old.id))
        .map(|old| old.id.into_inner())
        .collect();
    if !removed.is_empty() {
        transaction_entries::Entity::delete_many()
            .filter(transaction_entries::Column::Id.is_in(removed))
            .exec(conn)
            .await
            .map_err(db_err)?;
    }

    for entry in after {
        match before.iter().find(|old| old.id == entry.id) {
            None => {
                entry_active_model(entry)?
                    .insert(conn)
                    .await
                    .map_err(db_err)?;
            }
            Some(old) if old != entry => {
                entry_active_model(entry)?
                    .update(conn)
                    .await
                    .map_err(db_err)?;
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Writes state, date, last-modified and settlement of a transaction, but
/// only if the stored state is still `expected`.
///
/// # Errors
///
/// `LedgerError::InvalidStateTransition` if another writer changed the state
/// first.
pub(crate) async fn write_header<C: ConnectionTrait>(
    conn: &C,
    transaction: &Transaction,
    expected: TransactionState,
) -> Result<(), LedgerError> {
    let result = transactions::Entity::update_many()
        .col_expr(
            transactions::Column::State,
            Expr::value(enums::TransactionState::from(transaction.state)),
        )
        .col_expr(transactions::Column::Date, Expr::value(transaction.date))
        .col_expr(
            transactions::Column::LastModified,
            Expr::value(transaction.last_modified),
        )
        .col_expr(
            transactions::Column::SettlementId,
            Expr::value(transaction.settlement.map(|link| link.id.into_inner())),
        )
        .filter(transactions::Column::Id.eq(transaction.id.into_inner()))
        .filter(transactions::Column::State.eq(enums::TransactionState::from(expected)))
        .exec(conn)
        .await
        .map_err(db_err)?;

    if result.rows_affected == 1 {
        Ok(())
    } else {
        Err(LedgerError::InvalidStateTransition {
            from: expected,
            to: transaction.state,
        })
    }
}

/// Drives `transaction` through one workflow step and persists the result:
/// the state change (compare-and-set) and the new log record.
pub(crate) async fn transition<C: ConnectionTrait>(
    conn: &C,
    transaction: &mut Transaction,
    log_type: LogType,
    actor: UserId,
    message: Option<&str>,
) -> Result<TransactionLog, LedgerError> {
    find_user(conn, actor).await?;
    let directory =
        account_directory(conn, transaction.entries.iter().map(|e| e.account_id)).await?;

    let from = transaction.state;
    let log = match log_type {
        LogType::Pending => transaction.set_pending(actor, message, lookup(&directory)),
        LogType::Committed => transaction.set_committed(actor, message, lookup(&directory)),
        LogType::Rejected => transaction.set_rejected(actor, message, lookup(&directory)),
    }?;

    write_header(conn, transaction, from).await?;
    log_active_model(&log)
        .insert(conn)
        .await
        .map_err(db_err)?;

    info!(
        transaction_id = %transaction.id,
        from = %from,
        to = %transaction.state,
        actor = %actor,
        "Transaction state changed"
    );
    Ok(log)
}

// ============================================================================
// Scoped queries
// ============================================================================

/// Condition selecting the entries that touch `scope`.
///
/// A group scope matches entries on any account of the group, an account
/// scope entries on that account.
pub(crate) fn entries_in_scope(scope: LedgerScope) -> SimpleExpr {
    match scope {
        LedgerScope::Account(account_id) => {
            transaction_entries::Column::AccountId.eq(account_id.into_inner())
        }
        LedgerScope::Group(group_id) => transaction_entries::Column::AccountId.in_subquery(
            Query::select()
                .column(accounts::Column::Id)
                .from(accounts::Entity)
                .and_where(accounts::Column::GroupId.eq(group_id.into_inner()))
                .to_owned(),
        ),
    }
}

/// Loads the transactions touching `scope` whose state passes `filter`,
/// ordered by date.
pub(crate) async fn transactions_in_scope<C: ConnectionTrait>(
    conn: &C,
    scope: LedgerScope,
    filter: TransactionFilter,
) -> Result<Vec<Transaction>, LedgerError> {
    let states: Vec<enums::TransactionState> =
        filter.states().iter().copied().map(Into::into).collect();
    let rows = transactions::Entity::find()
        .filter(transactions::Column::State.is_in(states))
        .filter(
            transactions::Column::Id.in_subquery(
                Query::select()
                    .column(transaction_entries::Column::TransactionId)
                    .from(transaction_entries::Entity)
                    .cond_where(entries_in_scope(scope))
                    .to_owned(),
            ),
        )
        .order_by_asc(transactions::Column::Date)
        .order_by_asc(transactions::Column::Id)
        .all(conn)
        .await
        .map_err(db_err)?;
    hydrate(conn, rows).await
}

/// Loads the balance view of every entry touching `scope` that counts for
/// `basis`.
pub(crate) async fn ledger_lines<C: ConnectionTrait>(
    conn: &C,
    scope: LedgerScope,
    basis: BalanceBasis,
) -> Result<Vec<LedgerLine>, LedgerError> {
    let states: Vec<enums::TransactionState> =
        basis.states().iter().copied().map(Into::into).collect();
    let rows = transaction_entries::Entity::find()
        .find_also_related(transactions::Entity)
        .filter(transactions::Column::State.is_in(states))
        .filter(entries_in_scope(scope))
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(rows
        .into_iter()
        .filter_map(|(entry, transaction)| {
            let transaction = transaction?;
            Some(LedgerLine {
                account_id: AccountId::from(entry.account_id),
                date: transaction.date,
                state: transaction.state.into(),
                debit: from_minor_units(entry.debit),
                credit: from_minor_units(entry.credit),
            })
        })
        .collect())
}

/// Computes one account's balance.
pub(crate) async fn account_balance<C: ConnectionTrait>(
    conn: &C,
    account_id: AccountId,
    basis: BalanceBasis,
    as_of: Option<chrono::NaiveDate>,
) -> Result<Decimal, LedgerError> {
    let lines = ledger_lines(conn, LedgerScope::Account(account_id), basis).await?;
    Ok(balance::balance(&lines, account_id, basis, as_of))
}
