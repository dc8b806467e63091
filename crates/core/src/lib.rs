//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Double-entry bookkeeping logic
//! - `workflow` - Transaction lifecycle state machine
//! - `alerts` - Balance alerts for members under a group limit
//! - `notify` - Notification collaborator

pub mod alerts;
pub mod ledger;
pub mod notify;
pub mod workflow;
