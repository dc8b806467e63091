//! Concurrent state transitions on one pending transaction.
//!
//! Of competing commits and rejects exactly one may win; the losers fail
//! with an invalid state transition and write no log.

mod common;

use common::{setup, transfer};
use futures::future::join_all;
use rust_decimal_macros::dec;
use tally_core::ledger::{LedgerError, LogType, TransactionState};

#[tokio::test]
async fn test_concurrent_commit_and_reject_single_winner() {
    let ledger = setup().await;
    let fx = ledger.fixture("race").await;
    let (_, x) = &fx.members[0];
    let pending = ledger.pending(&fx, &transfer(&fx.bank, x, dec!(80))).await;

    let attempts = (0..8).map(|i| {
        let workflow = ledger.workflow.clone();
        let (id, actor) = (pending.id, fx.admin);
        async move {
            if i % 2 == 0 {
                workflow.set_committed(id, actor, None).await
            } else {
                workflow.set_rejected(id, actor, None).await
            }
        }
    });
    let results = join_all(attempts).await;

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err, LedgerError::InvalidStateTransition { .. }),
                "unexpected error: {err}"
            );
        }
    }

    let stored = ledger.transactions.get(pending.id).await.unwrap();
    let terminal_logs = stored
        .logs
        .iter()
        .filter(|log| log.log_type != LogType::Pending)
        .count();
    assert_eq!(terminal_logs, 1);
    match winners[0].log_type {
        LogType::Committed => assert_eq!(stored.state, TransactionState::Committed),
        LogType::Rejected => assert_eq!(stored.state, TransactionState::Rejected),
        LogType::Pending => panic!("a pending log cannot win"),
    }
}

#[tokio::test]
async fn test_concurrent_commits_keep_balances_exact() {
    let ledger = setup().await;
    let fx = ledger.fixture("many").await;
    let (_, x) = &fx.members[0];

    let mut ids = Vec::new();
    for _ in 0..20 {
        ids.push(ledger.pending(&fx, &transfer(&fx.bank, x, dec!(1.25))).await.id);
    }
    let results = join_all(ids.iter().map(|id| {
        let workflow = ledger.workflow.clone();
        let actor = fx.admin;
        let id = *id;
        async move { workflow.set_committed(id, actor, None).await }
    }))
    .await;
    assert!(results.iter().all(Result::is_ok));

    assert_eq!(ledger.accounts.signed_balance(x.id).await.unwrap(), dec!(25));
    assert_eq!(ledger.accounts.confirmed_balance(fx.bank.id).await.unwrap(), dec!(25));
}
