//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::groups::Entity as Groups;
pub use super::role_accounts::Entity as RoleAccounts;
pub use super::settlements::Entity as Settlements;
pub use super::transaction_entries::Entity as TransactionEntries;
pub use super::transaction_logs::Entity as TransactionLogs;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
