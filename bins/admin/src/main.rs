//! Tally administration CLI.
//!
//! Usage:
//!   tally-admin create-group --name <name> --slug <slug> [--warn-limit N] [--block-limit N]
//!   tally-admin create-user --group <slug> --username <name> [--full-name <name>]
//!   tally-admin balances --group <slug>
//!   tally-admin balance-alerts --group <slug> [--dry-run]

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use tally_core::ledger::{Group, LedgerError};
use tally_core::ledger::provision::UserAccountDefaults;
use tally_core::notify::Notifier;
use tally_db::{AccountRepository, GroupRepository, TracingNotifier, UserRepository, connect};
use tally_shared::AppConfig;
use tally_shared::types::UserId;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "tally-admin", version, about = "Manage Tally groups, members and balances")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a group with its default Bank and Cash accounts.
    CreateGroup {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Unique slug.
        #[arg(long)]
        slug: String,
        /// Members below this balance get a warning.
        #[arg(long)]
        warn_limit: Option<i64>,
        /// Members below this balance are blocked.
        #[arg(long)]
        block_limit: Option<i64>,
        /// Contact address.
        #[arg(long)]
        email: Option<String>,
        /// Bank account number.
        #[arg(long)]
        account_number: Option<String>,
    },
    /// Create a user and their account in a group, unless they exist.
    CreateUser {
        /// Group slug.
        #[arg(long)]
        group: String,
        /// Username.
        #[arg(long)]
        username: String,
        /// Full name, used as the account name.
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Print the balance and limit status of every account in a group.
    Balances {
        /// Group slug.
        #[arg(long)]
        group: String,
    },
    /// Notify members whose balance is under a group limit.
    BalanceAlerts {
        /// Group slug.
        #[arg(long)]
        group: String,
        /// Print the alerts instead of sending them.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;

    match run(db, &config, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match describe(&err) {
            Some(line) => {
                eprintln!("{line}");
                Ok(ExitCode::FAILURE)
            }
            None => Err(err),
        },
    }
}

async fn run(db: DatabaseConnection, config: &AppConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::CreateGroup {
            name,
            slug,
            warn_limit,
            block_limit,
            email,
            account_number,
        } => {
            let mut group = Group::new(name, slug);
            group.limits.warn_limit = warn_limit;
            group.limits.block_limit = block_limit;
            group.email = email;
            group.account_number = account_number;
            let created = GroupRepository::new(db).save(&group).await?;
            println!("Created group {} ({})", group.slug, group.id);
            for account in created {
                println!("  account {} ({})", account.slug, account.id);
            }
        }
        Command::CreateUser {
            group,
            username,
            full_name,
        } => create_user(db, config, &group, &username, full_name.as_deref()).await?,
        Command::Balances { group } => balances(db, &group).await?,
        Command::BalanceAlerts { group, dry_run } => balance_alerts(db, &group, dry_run).await?,
    }

    Ok(())
}

/// Formats a ledger error as `error[CODE]: message`. Other errors are left
/// to anyhow's report.
fn describe(err: &anyhow::Error) -> Option<String> {
    err.downcast_ref::<LedgerError>()
        .map(|ledger| format!("error[{}]: {ledger}", ledger.error_code()))
}

async fn create_user(
    db: DatabaseConnection,
    config: &AppConfig,
    group_slug: &str,
    username: &str,
    full_name: Option<&str>,
) -> anyhow::Result<()> {
    let group = GroupRepository::new(db.clone()).find_by_slug(group_slug).await?;
    let email = config.provisioning.email_for(username);

    let (user, created) = UserRepository::new(db.clone())
        .get_or_create(username, full_name, email.as_deref())
        .await?;
    if created {
        info!(username, "Created user");
    } else {
        info!(username, "User already exists");
    }

    let defaults = UserAccountDefaults::for_member(username, user.full_name.as_deref());
    let (account, created) = AccountRepository::new(db)
        .get_or_create_user_account(group.id, UserId::from(user.id), defaults)
        .await?;
    if created {
        info!(username, account = %account.slug, group = %group.slug, "Created account");
    } else {
        info!(username, account = %account.slug, group = %group.slug, "Account already exists");
    }
    Ok(())
}

async fn balances(db: DatabaseConnection, group_slug: &str) -> anyhow::Result<()> {
    let group = GroupRepository::new(db.clone()).find_by_slug(group_slug).await?;
    let standings = AccountRepository::new(db).group_standings(group.id).await?;

    println!("{:<24} {:>12} {:>12}  flags", "account", "balance", "signed");
    for (account, standing) in standings {
        let mut flags = Vec::new();
        if standing.blocked {
            flags.push("blocked");
        }
        if standing.needs_warning {
            flags.push("warning");
        }
        println!(
            "{:<24} {:>12.2} {:>12.2}  {}",
            account.slug,
            standing.balance,
            standing.signed_balance,
            flags.join(",")
        );
    }
    Ok(())
}

async fn balance_alerts(
    db: DatabaseConnection,
    group_slug: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    let group = GroupRepository::new(db.clone()).find_by_slug(group_slug).await?;
    let alerts = AccountRepository::new(db).balance_alerts(group.id).await?;

    let notifier = TracingNotifier;
    for alert in &alerts {
        if dry_run {
            println!("{} {}: {}", alert.owner, alert.account_id, alert.message());
        } else {
            notifier.notify(&alert.to_notification());
        }
    }
    info!(group = %group.slug, alerts = alerts.len(), dry_run, "Balance alerts processed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_carry_their_code() {
        let err = anyhow::Error::from(LedgerError::GroupNotFound("club".into()));
        assert_eq!(
            describe(&err).unwrap(),
            "error[GROUP_NOT_FOUND]: Group not found: club"
        );
    }

    #[test]
    fn test_other_errors_are_not_described() {
        let err = anyhow::anyhow!("failed to connect to database");
        assert!(describe(&err).is_none());
    }
}
