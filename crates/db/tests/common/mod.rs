//! Shared fixtures for the database integration tests.
//!
//! Every test gets its own in-memory `SQLite` database with the schema
//! migrated. The pool holds a single connection so the database lives as
//! long as the pool.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tally_core::ledger::{Account, EntryInput, Group, Role, Transaction};
use tally_core::ledger::provision::UserAccountDefaults;
use tally_core::notify::{Notification, Notifier};
use tally_db::migration::Migrator;
use tally_db::{
    AccountRepository, GroupRepository, SettlementRepository, TransactionRepository,
    UserRepository, WorkflowRepository,
};
use tally_shared::DatabaseConfig;
use tally_shared::types::UserId;

/// Records every notification it is handed.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.sent.lock().unwrap().push(notification.clone());
    }
}

pub struct TestLedger {
    pub db: DatabaseConnection,
    pub notifier: Arc<RecordingNotifier>,
    pub users: UserRepository,
    pub groups: GroupRepository,
    pub accounts: AccountRepository,
    pub settlements: SettlementRepository,
    pub transactions: TransactionRepository,
    pub workflow: WorkflowRepository,
}

pub async fn setup() -> TestLedger {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
    };
    let db = tally_db::connect(&config).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let notifier = Arc::new(RecordingNotifier::default());
    TestLedger {
        users: UserRepository::new(db.clone()),
        groups: GroupRepository::new(db.clone()),
        accounts: AccountRepository::new(db.clone()),
        settlements: SettlementRepository::new(db.clone()),
        transactions: TransactionRepository::new(db.clone()),
        workflow: WorkflowRepository::new(db.clone(), notifier.clone()),
        notifier,
        db,
    }
}

/// A group with its default accounts and three members.
pub struct Fixture {
    pub group: Group,
    pub bank: Account,
    pub cash: Account,
    pub admin: UserId,
    pub members: Vec<(UserId, Account)>,
}

impl TestLedger {
    pub async fn user(&self, username: &str) -> UserId {
        let user = self.users.create(username, None, None).await.unwrap();
        UserId::from(user.id)
    }

    pub async fn member(&self, group: &Group, username: &str) -> (UserId, Account) {
        let user = self.user(username).await;
        let (account, _) = self
            .accounts
            .get_or_create_user_account(
                group.id,
                user,
                UserAccountDefaults::for_member(username, None),
            )
            .await
            .unwrap();
        (user, account)
    }

    pub async fn fixture(&self, slug: &str) -> Fixture {
        let group = Group::new(slug.to_uppercase(), slug);
        self.groups.save(&group).await.unwrap();
        let bank = self.groups.role_account(group.id, Role::Bank).await.unwrap();
        let cash = self.groups.role_account(group.id, Role::Cash).await.unwrap();
        let admin = self.user(&format!("{slug}-admin")).await;
        let mut members = Vec::new();
        for name in ["x", "y", "z"] {
            members.push(self.member(&group, &format!("{slug}-{name}")).await);
        }
        Fixture {
            group,
            bank,
            cash,
            admin,
            members,
        }
    }

    /// Creates a transaction with the given legs and takes it to `Pending`.
    pub async fn pending(&self, fixture: &Fixture, legs: &[EntryInput]) -> Transaction {
        let transaction = self
            .transactions
            .create(fixture.group.id, legs)
            .await
            .unwrap();
        self.workflow
            .set_pending(transaction.id, fixture.admin, None)
            .await
            .unwrap();
        self.transactions.get(transaction.id).await.unwrap()
    }

    /// Creates, submits and commits a transaction.
    pub async fn committed(&self, fixture: &Fixture, legs: &[EntryInput]) -> Transaction {
        let transaction = self.pending(fixture, legs).await;
        self.workflow
            .set_committed(transaction.id, fixture.admin, None)
            .await
            .unwrap();
        self.transactions.get(transaction.id).await.unwrap()
    }
}

/// Debit `from`, credit `to`.
pub fn transfer(from: &Account, to: &Account, amount: Decimal) -> [EntryInput; 2] {
    [
        EntryInput::debit(from.id, amount),
        EntryInput::credit(to.id, amount),
    ]
}
