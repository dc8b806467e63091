//! Property-based tests for WorkflowService.

use proptest::prelude::*;
use tally_shared::types::UserId;
use uuid::Uuid;

use crate::ledger::error::LedgerError;
use crate::ledger::types::TransactionState;
use crate::workflow::service::WorkflowService;

/// Strategy for generating random TransactionState values.
fn arb_state() -> impl Strategy<Value = TransactionState> {
    prop_oneof![
        Just(TransactionState::New),
        Just(TransactionState::Pending),
        Just(TransactionState::Committed),
        Just(TransactionState::Rejected),
    ]
}

/// Strategy for generating random users.
fn arb_user() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating optional messages, blank ones included.
fn arb_message() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[a-zA-Z0-9 ]{0,60}".prop_map(Some)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Commit and reject are only reachable from Pending
    // =========================================================================

    #[test]
    fn prop_commit_only_from_pending(state in arb_state(), user in arb_user()) {
        let result = WorkflowService::set_committed(state, user, None);
        if state == TransactionState::Pending {
            let action = result.unwrap();
            prop_assert_eq!(action.new_state(), TransactionState::Committed);
            prop_assert_eq!(action.actor, user);
        } else {
            let is_invalid_transition =
                matches!(result, Err(LedgerError::InvalidStateTransition { .. }));
            prop_assert!(is_invalid_transition);
        }
    }

    #[test]
    fn prop_reject_only_from_pending(state in arb_state(), user in arb_user()) {
        let result = WorkflowService::set_rejected(state, user, None);
        prop_assert_eq!(result.is_ok(), state == TransactionState::Pending);
        if let Err(err) = result {
            prop_assert!(err.is_invalid_transaction());
        }
    }

    // =========================================================================
    // Pending is reachable from New and Pending, never from a terminal state
    // =========================================================================

    #[test]
    fn prop_pending_not_from_terminal(state in arb_state(), user in arb_user()) {
        let result = WorkflowService::set_pending(state, user, None);
        prop_assert_eq!(result.is_ok(), !state.is_frozen());
    }

    // =========================================================================
    // Messages are stored trimmed, blank ones not at all
    // =========================================================================

    #[test]
    fn prop_message_normalized(user in arb_user(), message in arb_message()) {
        let action =
            WorkflowService::set_pending(TransactionState::New, user, message.as_deref()).unwrap();
        match message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => {
                prop_assert_eq!(action.message.as_deref(), Some(m));
            }
            _ => {
                prop_assert_eq!(action.message, None);
            }
        }
    }

    #[test]
    fn prop_action_matches_valid_log_types(state in arb_state(), user in arb_user()) {
        let allowed = WorkflowService::valid_log_types(state);
        let attempts = [
            WorkflowService::set_pending(state, user, None),
            WorkflowService::set_committed(state, user, None),
            WorkflowService::set_rejected(state, user, None),
        ];
        let succeeded: Vec<_> = attempts
            .into_iter()
            .filter_map(Result::ok)
            .map(|action| action.log_type)
            .collect();
        prop_assert_eq!(succeeded, allowed);
    }
}
