//! Transaction workflow management.
//!
//! This module implements the transaction lifecycle state machine.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (`WorkflowAction`)
//! - `service` - State transition logic

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::WorkflowService;
pub use types::WorkflowAction;
