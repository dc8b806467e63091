//! `SeaORM` entity definitions for the ledger tables.

pub mod prelude;

pub mod accounts;
pub mod groups;
pub mod role_accounts;
pub mod sea_orm_active_enums;
pub mod settlements;
pub mod transaction_entries;
pub mod transaction_logs;
pub mod transactions;
pub mod users;
