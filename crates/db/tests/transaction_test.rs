//! Integration tests for transaction storage, entry edits and scoped queries.

mod common;

use common::{setup, transfer};
use rust_decimal_macros::dec;
use tally_core::ledger::{
    EntryInput, ErrorKind, LedgerError, LedgerScope, TransactionFilter, TransactionState,
};

#[tokio::test]
async fn test_create_stores_draft() {
    let ledger = setup().await;
    let fx = ledger.fixture("draft").await;
    let (_, x) = &fx.members[0];

    // drafts may be unbalanced
    let created = ledger
        .transactions
        .create(fx.group.id, &[EntryInput::debit(x.id, dec!(10))])
        .await
        .unwrap();
    assert_eq!(created.state, TransactionState::New);
    assert!(created.date.is_some());

    let loaded = ledger.transactions.get(created.id).await.unwrap();
    assert_eq!(loaded.entries.len(), 1);
    assert_eq!(loaded.entries[0].debit, dec!(10));
    assert!(loaded.logs.is_empty());

    ledger
        .transactions
        .add_entry(created.id, EntryInput::credit(fx.bank.id, dec!(10)))
        .await
        .unwrap();
    let loaded = ledger.transactions.get(created.id).await.unwrap();
    assert!(loaded.totals().is_balanced());
}

#[tokio::test]
async fn test_new_transactions_are_not_listed() {
    let ledger = setup().await;
    let fx = ledger.fixture("hidden").await;
    let (_, x) = &fx.members[0];

    ledger
        .transactions
        .create(fx.group.id, &transfer(&fx.bank, x, dec!(5)))
        .await
        .unwrap();
    let scope = LedgerScope::Group(fx.group.id);
    assert!(
        ledger
            .transactions
            .transactions_with_rejected(scope)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_state_filters() {
    let ledger = setup().await;
    let fx = ledger.fixture("filters").await;
    let (_, x) = &fx.members[0];
    let (_, y) = &fx.members[1];

    let pending = ledger.pending(&fx, &transfer(&fx.bank, x, dec!(1))).await;
    let committed = ledger.committed(&fx, &transfer(&fx.bank, y, dec!(2))).await;
    let rejected = ledger.pending(&fx, &transfer(x, y, dec!(3))).await;
    ledger
        .workflow
        .set_rejected(rejected.id, fx.admin, Some("nope"))
        .await
        .unwrap();

    let scope = LedgerScope::Group(fx.group.id);
    let ids = |list: Vec<tally_core::ledger::Transaction>| -> Vec<_> {
        list.into_iter().map(|t| t.id).collect()
    };

    let all = ids(ledger.transactions.transactions_with_rejected(scope).await.unwrap());
    assert_eq!(all.len(), 3);
    let not_rejected = ids(ledger.transactions.transactions(scope).await.unwrap());
    assert_eq!(not_rejected.len(), 2);
    assert!(!not_rejected.contains(&rejected.id));
    assert_eq!(
        ids(ledger.transactions.pending(scope).await.unwrap()),
        vec![pending.id]
    );
    assert_eq!(
        ids(ledger.transactions.committed(scope).await.unwrap()),
        vec![committed.id]
    );
    assert_eq!(
        ids(ledger.transactions.rejected(scope).await.unwrap()),
        vec![rejected.id]
    );

    // every filter selects a subset of the widest one
    for filter in [
        TransactionFilter::NotRejected,
        TransactionFilter::Pending,
        TransactionFilter::Committed,
        TransactionFilter::Rejected,
    ] {
        let subset = ids(ledger.transactions.list(scope, filter).await.unwrap());
        assert!(subset.iter().all(|id| all.contains(id)));
    }
}

#[tokio::test]
async fn test_account_scope_and_group_isolation() {
    let ledger = setup().await;
    let fx = ledger.fixture("scope-a").await;
    let other = ledger.fixture("scope-b").await;
    let (_, x) = &fx.members[0];
    let (_, y) = &fx.members[1];

    let mine = ledger.committed(&fx, &transfer(&fx.bank, x, dec!(4))).await;
    ledger.committed(&fx, &transfer(&fx.bank, y, dec!(4))).await;
    ledger
        .committed(&other, &transfer(&other.bank, &other.members[0].1, dec!(4)))
        .await;

    let for_x = ledger
        .transactions
        .transactions(LedgerScope::Account(x.id))
        .await
        .unwrap();
    assert_eq!(for_x.len(), 1);
    assert_eq!(for_x[0].id, mine.id);

    let for_group = ledger
        .transactions
        .transactions(LedgerScope::Group(fx.group.id))
        .await
        .unwrap();
    assert_eq!(for_group.len(), 2);
    assert!(for_group.iter().all(|t| t.group_id == fx.group.id));
}

#[tokio::test]
async fn test_delete_only_new() {
    let ledger = setup().await;
    let fx = ledger.fixture("delete").await;
    let (_, x) = &fx.members[0];

    let draft = ledger
        .transactions
        .create(fx.group.id, &transfer(&fx.bank, x, dec!(1)))
        .await
        .unwrap();
    ledger.transactions.delete(draft.id).await.unwrap();
    assert!(matches!(
        ledger.transactions.get(draft.id).await,
        Err(LedgerError::TransactionNotFound(_))
    ));

    let pending = ledger.pending(&fx, &transfer(&fx.bank, x, dec!(1))).await;
    let err = ledger.transactions.delete(pending.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::CanOnlyDeleteNew));
    assert!(ledger.transactions.get(pending.id).await.is_ok());
}

#[tokio::test]
async fn test_pending_edits_are_validated() {
    let ledger = setup().await;
    let fx = ledger.fixture("edits").await;
    let (_, x) = &fx.members[0];

    let pending = ledger.pending(&fx, &transfer(&fx.bank, x, dec!(20))).await;
    let err = ledger
        .transactions
        .update_entry(pending.id, EntryInput::debit(fx.bank.id, dec!(25)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnbalancedTransaction { .. }));
    let stored = ledger.transactions.get(pending.id).await.unwrap();
    assert_eq!(stored.entry(fx.bank.id).unwrap().debit, dec!(20));

    let updated = ledger
        .transactions
        .replace_entries(pending.id, &transfer(&fx.cash, x, dec!(25)))
        .await
        .unwrap();
    assert_eq!(updated.totals().debit, dec!(25));
    let stored = ledger.transactions.get(pending.id).await.unwrap();
    assert!(stored.entry(fx.bank.id).is_none());
    assert_eq!(stored.entry(fx.cash.id).unwrap().debit, dec!(25));
}

#[tokio::test]
async fn test_committed_entries_are_frozen() {
    let ledger = setup().await;
    let fx = ledger.fixture("frozen").await;
    let (_, x) = &fx.members[0];

    let committed = ledger.committed(&fx, &transfer(&fx.bank, x, dec!(20))).await;
    let err = ledger
        .transactions
        .remove_entry(committed.id, x.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::TransactionFrozen(TransactionState::Committed)));
    assert!(err.is_invalid_transaction());
}

#[tokio::test]
async fn test_foreign_account_rejected_on_submit() {
    let ledger = setup().await;
    let fx = ledger.fixture("home").await;
    let other = ledger.fixture("away").await;

    let draft = ledger
        .transactions
        .create(fx.group.id, &transfer(&fx.bank, &other.members[0].1, dec!(1)))
        .await
        .unwrap();
    let err = ledger
        .workflow
        .set_pending(draft.id, fx.admin, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::GroupMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidTransaction);
}

#[tokio::test]
async fn test_closed_settlement_blocks_changes() {
    let ledger = setup().await;
    let fx = ledger.fixture("settle").await;
    let (_, x) = &fx.members[0];

    let settlement = ledger
        .settlements
        .create(fx.group.id, chrono::NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(), "October")
        .await
        .unwrap();
    let pending = ledger.pending(&fx, &transfer(&fx.bank, x, dec!(3))).await;
    ledger
        .transactions
        .assign_settlement(pending.id, Some(settlement.id))
        .await
        .unwrap();

    ledger.settlements.close(settlement.id).await.unwrap();
    let err = ledger
        .workflow
        .set_committed(pending.id, fx.admin, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SettlementClosed(_)));
    let err = ledger
        .transactions
        .update_entry(pending.id, EntryInput::debit(fx.bank.id, dec!(4)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SettlementClosed(_)));

    let draft = ledger
        .transactions
        .create(fx.group.id, &transfer(&fx.bank, x, dec!(1)))
        .await
        .unwrap();
    let err = ledger
        .transactions
        .assign_settlement(draft.id, Some(settlement.id))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SettlementClosed(_)));

    ledger.settlements.reopen(settlement.id).await.unwrap();
    ledger
        .workflow
        .set_committed(pending.id, fx.admin, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_forced_save_keeps_state_and_balance() {
    let ledger = setup().await;
    let fx = ledger.fixture("resave").await;
    let (_, x) = &fx.members[0];
    let (_, y) = &fx.members[1];

    let pending = ledger.pending(&fx, &transfer(&fx.bank, x, dec!(30))).await;
    let committed = ledger.committed(&fx, &transfer(x, y, dec!(12.5))).await;

    for before in [pending, committed] {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let saved = ledger.transactions.save(before.id).await.unwrap();
        let loaded = ledger.transactions.get(before.id).await.unwrap();

        assert_eq!(saved.state, before.state);
        assert_eq!(loaded.state, before.state);
        assert!(loaded.totals().is_balanced());
        assert_eq!(loaded.totals(), before.totals());
        assert_eq!(loaded.date, before.date);
        assert!(loaded.last_modified > before.last_modified);
        assert_eq!(loaded.logs.len(), before.logs.len());
    }
}

#[tokio::test]
async fn test_forced_save_rejects_unbalanced_draft() {
    let ledger = setup().await;
    let fx = ledger.fixture("badsave").await;
    let (_, x) = &fx.members[0];

    let draft = ledger
        .transactions
        .create(
            fx.group.id,
            &[
                EntryInput::debit(fx.bank.id, dec!(40)),
                EntryInput::credit(x.id, dec!(25)),
            ],
        )
        .await
        .unwrap();
    let before = ledger.transactions.get(draft.id).await.unwrap();

    let err = ledger.transactions.save(draft.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::UnbalancedTransaction { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidTransaction);

    let after = ledger.transactions.get(draft.id).await.unwrap();
    assert_eq!(after.state, TransactionState::New);
    assert_eq!(after.last_modified, before.last_modified);
    assert_eq!(after.totals(), before.totals());
}
