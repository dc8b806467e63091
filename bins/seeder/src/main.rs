//! Database seeder for Tally development and testing.
//!
//! Seeds a demo group with its default accounts, a handful of members and a
//! few deposits, transfers and withdrawals in different workflow states.
//! Running it twice leaves the existing demo group alone.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tally_core::ledger::provision::UserAccountDefaults;
use tally_core::ledger::{Account, BalanceLimits, Group, LedgerError, Movement};
use tally_db::{
    AccountRepository, GroupRepository, TracingNotifier, UserRepository, WorkflowRepository,
    connect,
};
use tally_shared::AppConfig;
use tally_shared::types::UserId;

const DEMO_GROUP: &str = "demo";

/// Demo members: username and full name.
const MEMBERS: [(&str, &str); 4] = [
    ("alice", "Alice Andersen"),
    ("bob", "Bob Berg"),
    ("carol", "Carol Christensen"),
    ("dave", "Dave Dahl"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    println!("Connecting to database...");
    let db = connect(&config.database).await?;

    println!("Seeding demo group...");
    let Some(group) = seed_group(&db).await? else {
        println!("  Demo group already exists, skipping...");
        return Ok(());
    };

    println!("Seeding members...");
    let members = seed_members(&db, &config, &group).await?;

    println!("Seeding transactions...");
    seed_transactions(&db, &group, &members).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Creates the demo group, or returns `None` if it already exists.
async fn seed_group(db: &DatabaseConnection) -> Result<Option<Group>, LedgerError> {
    let groups = GroupRepository::new(db.clone());
    match groups.find_by_slug(DEMO_GROUP).await {
        Ok(_) => return Ok(None),
        Err(LedgerError::GroupNotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let mut group = Group::new("Demo Group", DEMO_GROUP);
    group.limits = BalanceLimits {
        warn_limit: Some(50),
        block_limit: Some(0),
    };
    group.account_number = Some("12345678901".to_string());
    for account in groups.save(&group).await? {
        println!("  Created account: {}", account.name);
    }
    Ok(Some(group))
}

async fn seed_members(
    db: &DatabaseConnection,
    config: &AppConfig,
    group: &Group,
) -> Result<Vec<(UserId, Account)>, LedgerError> {
    let users = UserRepository::new(db.clone());
    let accounts = AccountRepository::new(db.clone());

    let mut members = Vec::with_capacity(MEMBERS.len());
    for (username, full_name) in MEMBERS {
        let email = config.provisioning.email_for(username);
        let (user, _) = users
            .get_or_create(username, Some(full_name), email.as_deref())
            .await?;
        let owner = UserId::from(user.id);
        let (account, _) = accounts
            .get_or_create_user_account(
                group.id,
                owner,
                UserAccountDefaults::for_member(username, Some(full_name)),
            )
            .await?;
        println!("  Member ready: {username}");
        members.push((owner, account));
    }
    Ok(members)
}

async fn seed_transactions(
    db: &DatabaseConnection,
    group: &Group,
    members: &[(UserId, Account)],
) -> Result<(), LedgerError> {
    let workflow = WorkflowRepository::new(db.clone(), Arc::new(TracingNotifier));
    let amount = |cents: i64| Decimal::new(cents, 2);

    // everyone pays in, the first two deposits get committed
    let mut deposits = Vec::new();
    for (i, (owner, account)) in members.iter().enumerate() {
        let cents = 10_000 + 2_500 * i64::try_from(i).unwrap_or_default();
        let movement =
            Movement::deposit(account.id, amount(cents))?.with_details(Some("Initial deposit"));
        deposits.push(workflow.submit_movement(group.id, &movement, *owner).await?);
    }
    let (admin, _) = members[0];
    for deposit in deposits.iter().take(2) {
        workflow
            .set_committed(deposit.id, admin, Some("Received"))
            .await?;
    }
    workflow
        .set_rejected(deposits[3].id, admin, Some("Never arrived"))
        .await?;

    // a covered transfer commits at once
    let (alice, alice_account) = &members[0];
    let (_, bob_account) = &members[1];
    let transfer = Movement::transfer(alice_account.id, bob_account.id, amount(4_250))?
        .with_details(Some("Dinner"));
    let booked = workflow.submit_movement(group.id, &transfer, *alice).await?;
    println!("  Transfer is {}", booked.state);

    // bob overdraws and ends up below the block limit once committed
    let (bob, _) = members[1];
    let withdrawal = Movement::withdrawal(bob_account.id, amount(30_000))?;
    let booked = workflow.submit_movement(group.id, &withdrawal, bob).await?;
    workflow.set_committed(booked.id, admin, None).await?;

    println!("  Created {} transactions", deposits.len() + 2);
    Ok(())
}
