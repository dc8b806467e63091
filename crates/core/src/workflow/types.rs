//! Workflow domain types for the transaction lifecycle.

use chrono::{DateTime, Utc};
use tally_shared::types::{LogId, TransactionId, UserId};

use crate::ledger::log::TransactionLog;
use crate::ledger::types::{LogType, TransactionState};

/// A validated state transition with its audit data.
///
/// Produced by [`crate::workflow::WorkflowService`]; applying it means
/// flipping the state and appending the log record it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowAction {
    /// The kind of log record to append.
    pub log_type: LogType,
    /// The state before the transition.
    pub from: TransactionState,
    /// The state after the transition.
    pub new_state: TransactionState,
    /// Who performed the transition.
    pub actor: UserId,
    /// When the transition was performed.
    pub at: DateTime<Utc>,
    /// Optional message, blank messages already dropped.
    pub message: Option<String>,
}

impl WorkflowAction {
    /// Returns the state resulting from this action.
    #[must_use]
    pub const fn new_state(&self) -> TransactionState {
        self.new_state
    }

    /// Builds the log record describing this action.
    #[must_use]
    pub fn to_log(&self, transaction_id: TransactionId) -> TransactionLog {
        TransactionLog {
            id: LogId::new(),
            transaction_id,
            log_type: self.log_type,
            timestamp: self.at,
            actor: self.actor,
            message: self.message.clone(),
        }
    }
}
