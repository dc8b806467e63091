//! Conversions between entity models and ledger domain types.

use sea_orm::ActiveValue::Set;
use tally_core::ledger::entry::{from_minor_units, to_minor_units};
use tally_core::ledger::{
    Account, AccountInfo, BalanceLimits, Group, LedgerError, Settlement, TransactionEntry,
    TransactionLog,
};
use tally_shared::types::{
    AccountId, EntryId, GroupId, LogId, SettlementId, TransactionId, UserId,
};

use crate::entities::{
    accounts, groups, settlements, transaction_entries, transaction_logs,
};

pub(crate) fn group_from_model(model: groups::Model) -> Group {
    Group {
        id: GroupId::from(model.id),
        name: model.name,
        slug: model.slug,
        limits: BalanceLimits {
            warn_limit: model.warn_limit,
            block_limit: model.block_limit,
        },
        account_number: model.account_number,
        email: model.email,
    }
}

pub(crate) fn account_from_model(model: accounts::Model) -> Account {
    Account {
        id: AccountId::from(model.id),
        group_id: GroupId::from(model.group_id),
        name: model.name,
        short_name: model.short_name,
        slug: model.slug,
        account_type: model.account_type.into(),
        owner: model.owner_id.map(UserId::from),
        active: model.active,
        blocked: model.blocked,
        ignore_block_limit: model.ignore_block_limit,
        group_account: model.group_account,
    }
}

pub(crate) fn account_info(model: &accounts::Model) -> AccountInfo {
    AccountInfo {
        id: AccountId::from(model.id),
        group_id: GroupId::from(model.group_id),
        owner: model.owner_id.map(UserId::from),
        group_account: model.group_account,
    }
}

pub(crate) fn account_active_model(account: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        group_id: Set(account.group_id.into_inner()),
        name: Set(account.name.clone()),
        short_name: Set(account.short_name.clone()),
        slug: Set(account.slug.clone()),
        account_type: Set(account.account_type.into()),
        owner_id: Set(account.owner.map(UserId::into_inner)),
        active: Set(account.active),
        blocked: Set(account.blocked),
        ignore_block_limit: Set(account.ignore_block_limit),
        group_account: Set(account.group_account),
    }
}

pub(crate) fn settlement_from_model(model: settlements::Model) -> Settlement {
    Settlement {
        id: SettlementId::from(model.id),
        group_id: GroupId::from(model.group_id),
        date: model.date,
        comment: model.comment,
        closed: model.closed,
    }
}

pub(crate) fn entry_from_model(model: transaction_entries::Model) -> TransactionEntry {
    TransactionEntry {
        id: EntryId::from(model.id),
        transaction_id: TransactionId::from(model.transaction_id),
        account_id: AccountId::from(model.account_id),
        debit: from_minor_units(model.debit),
        credit: from_minor_units(model.credit),
    }
}

pub(crate) fn entry_active_model(
    entry: &TransactionEntry,
) -> Result<transaction_entries::ActiveModel, LedgerError> {
    Ok(transaction_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        transaction_id: Set(entry.transaction_id.into_inner()),
        account_id: Set(entry.account_id.into_inner()),
        debit: Set(to_minor_units(entry.debit)?),
        credit: Set(to_minor_units(entry.credit)?),
    })
}

pub(crate) fn log_from_model(model: transaction_logs::Model) -> TransactionLog {
    TransactionLog {
        id: LogId::from(model.id),
        transaction_id: TransactionId::from(model.transaction_id),
        log_type: model.log_type.into(),
        timestamp: model.timestamp,
        actor: UserId::from(model.user_id),
        message: model.message,
    }
}

pub(crate) fn log_active_model(log: &TransactionLog) -> transaction_logs::ActiveModel {
    transaction_logs::ActiveModel {
        id: Set(log.id.into_inner()),
        transaction_id: Set(log.transaction_id.into_inner()),
        log_type: Set(log.log_type.into()),
        timestamp: Set(log.timestamp),
        user_id: Set(log.actor.into_inner()),
        message: Set(log.message.clone()),
    }
}
