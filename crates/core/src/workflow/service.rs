//! Workflow service for transaction state transitions.
//!
//! This module implements the state machine logic only. Validation of the
//! entries and the log-uniqueness rules are applied by the transaction
//! aggregate that consumes the resulting [`WorkflowAction`].

use chrono::Utc;
use tally_shared::types::UserId;

use crate::ledger::error::LedgerError;
use crate::ledger::log::normalize_message;
use crate::ledger::types::{LogType, TransactionState};
use crate::workflow::types::WorkflowAction;

/// Stateless service for managing transaction workflow transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Submit (or re-submit) a transaction.
    ///
    /// # Errors
    ///
    /// `LedgerError::InvalidStateTransition` unless the state is New or Pending.
    pub fn set_pending(
        current_state: TransactionState,
        actor: UserId,
        message: Option<&str>,
    ) -> Result<WorkflowAction, LedgerError> {
        Self::transition(current_state, LogType::Pending, actor, message)
    }

    /// Commit a pending transaction.
    ///
    /// # Errors
    ///
    /// `LedgerError::InvalidStateTransition` unless the state is Pending.
    pub fn set_committed(
        current_state: TransactionState,
        actor: UserId,
        message: Option<&str>,
    ) -> Result<WorkflowAction, LedgerError> {
        Self::transition(current_state, LogType::Committed, actor, message)
    }

    /// Reject a pending transaction.
    ///
    /// # Errors
    ///
    /// `LedgerError::InvalidStateTransition` unless the state is Pending.
    pub fn set_rejected(
        current_state: TransactionState,
        actor: UserId,
        message: Option<&str>,
    ) -> Result<WorkflowAction, LedgerError> {
        Self::transition(current_state, LogType::Rejected, actor, message)
    }

    /// Returns the log types a caller may record next from `current_state`.
    #[must_use]
    pub fn valid_log_types(current_state: TransactionState) -> Vec<LogType> {
        [LogType::Pending, LogType::Committed, LogType::Rejected]
            .into_iter()
            .filter(|log_type| current_state.can_transition_to(log_type.resulting_state()))
            .collect()
    }

    fn transition(
        current_state: TransactionState,
        log_type: LogType,
        actor: UserId,
        message: Option<&str>,
    ) -> Result<WorkflowAction, LedgerError> {
        let new_state = log_type.resulting_state();
        if !current_state.can_transition_to(new_state) {
            return Err(LedgerError::InvalidStateTransition {
                from: current_state,
                to: new_state,
            });
        }

        Ok(WorkflowAction {
            log_type,
            from: current_state,
            new_state,
            actor,
            at: Utc::now(),
            message: normalize_message(message),
        })
    }
}
