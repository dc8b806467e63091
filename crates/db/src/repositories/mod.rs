//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every repository reports failures as `LedgerError`.

mod convert;
mod error;
mod store;

pub mod account;
pub mod group;
pub mod settlement;
pub mod transaction;
pub mod user;
pub mod workflow;

pub use account::{AccountFilter, AccountRepository};
pub use group::GroupRepository;
pub use settlement::SettlementRepository;
pub use transaction::TransactionRepository;
pub use user::UserRepository;
pub use workflow::WorkflowRepository;
