//! Initial database migration.
//!
//! Creates the ledger tables, their foreign keys and the unique indexes that
//! back the `Conflict` errors of the repositories.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: USERS & GROUPS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Username).string_len(150).not_null())
                    .col(ColumnDef::new(Users::FullName).string_len(200))
                    .col(ColumnDef::new(Users::Email).string_len(254))
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Groups::Slug).string_len(50).not_null())
                    .col(ColumnDef::new(Groups::WarnLimit).big_integer())
                    .col(ColumnDef::new(Groups::BlockLimit).big_integer())
                    .col(ColumnDef::new(Groups::AccountNumber).string_len(11))
                    .col(ColumnDef::new(Groups::Email).string_len(254))
                    .col(
                        ColumnDef::new(Groups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: ACCOUNTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::GroupId).uuid().not_null())
                    .col(ColumnDef::new(Accounts::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Accounts::ShortName).string_len(100).not_null())
                    .col(ColumnDef::new(Accounts::Slug).string_len(50).not_null())
                    .col(ColumnDef::new(Accounts::AccountType).string_len(16).not_null())
                    .col(ColumnDef::new(Accounts::OwnerId).uuid())
                    .col(
                        ColumnDef::new(Accounts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Accounts::Blocked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::IgnoreBlockLimit)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::GroupAccount)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accounts_group")
                            .from(Accounts::Table, Accounts::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accounts_owner")
                            .from(Accounts::Table, Accounts::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoleAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoleAccounts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoleAccounts::GroupId).uuid().not_null())
                    .col(ColumnDef::new(RoleAccounts::Role).string_len(16).not_null())
                    .col(ColumnDef::new(RoleAccounts::AccountId).uuid().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_accounts_group")
                            .from(RoleAccounts::Table, RoleAccounts::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_role_accounts_account")
                            .from(RoleAccounts::Table, RoleAccounts::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 3: SETTLEMENTS & TRANSACTIONS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Settlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settlements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settlements::GroupId).uuid().not_null())
                    .col(ColumnDef::new(Settlements::Date).date().not_null())
                    .col(
                        ColumnDef::new(Settlements::Comment)
                            .string_len(200)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Settlements::Closed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_settlements_group")
                            .from(Settlements::Table, Settlements::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::GroupId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::SettlementId).uuid())
                    .col(ColumnDef::new(Transactions::Date).date())
                    .col(
                        ColumnDef::new(Transactions::LastModified)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::State).string_len(16).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_group")
                            .from(Transactions::Table, Transactions::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_settlement")
                            .from(Transactions::Table, Transactions::SettlementId)
                            .to(Settlements::Table, Settlements::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::TransactionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionEntries::AccountId).uuid().not_null())
                    .col(
                        ColumnDef::new(TransactionEntries::Debit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TransactionEntries::Credit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_entries_transaction")
                            .from(TransactionEntries::Table, TransactionEntries::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_entries_account")
                            .from(TransactionEntries::Table, TransactionEntries::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransactionLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransactionLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TransactionLogs::TransactionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionLogs::LogType).string_len(16).not_null())
                    .col(
                        ColumnDef::new(TransactionLogs::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TransactionLogs::UserId).uuid().not_null())
                    .col(ColumnDef::new(TransactionLogs::Message).string_len(200))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_logs_transaction")
                            .from(TransactionLogs::Table, TransactionLogs::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_logs_user")
                            .from(TransactionLogs::Table, TransactionLogs::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 4: UNIQUE CONSTRAINTS & LOOKUP INDEXES
        // ============================================================
        let indexes = [
            Index::create()
                .name("uq_users_username")
                .table(Users::Table)
                .col(Users::Username)
                .unique()
                .to_owned(),
            Index::create()
                .name("uq_groups_slug")
                .table(Groups::Table)
                .col(Groups::Slug)
                .unique()
                .to_owned(),
            Index::create()
                .name("uq_accounts_group_slug")
                .table(Accounts::Table)
                .col(Accounts::GroupId)
                .col(Accounts::Slug)
                .unique()
                .to_owned(),
            Index::create()
                .name("uq_accounts_group_owner")
                .table(Accounts::Table)
                .col(Accounts::GroupId)
                .col(Accounts::OwnerId)
                .unique()
                .to_owned(),
            Index::create()
                .name("uq_role_accounts_group_role")
                .table(RoleAccounts::Table)
                .col(RoleAccounts::GroupId)
                .col(RoleAccounts::Role)
                .unique()
                .to_owned(),
            Index::create()
                .name("uq_transaction_entries_transaction_account")
                .table(TransactionEntries::Table)
                .col(TransactionEntries::TransactionId)
                .col(TransactionEntries::AccountId)
                .unique()
                .to_owned(),
            Index::create()
                .name("idx_transaction_entries_account")
                .table(TransactionEntries::Table)
                .col(TransactionEntries::AccountId)
                .to_owned(),
            Index::create()
                .name("idx_transactions_group_state")
                .table(Transactions::Table)
                .col(Transactions::GroupId)
                .col(Transactions::State)
                .to_owned(),
            Index::create()
                .name("idx_transaction_logs_transaction")
                .table(TransactionLogs::Table)
                .col(TransactionLogs::TransactionId)
                .to_owned(),
        ];
        for index in indexes {
            manager.create_index(index).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransactionLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TransactionEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Settlements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoleAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    FullName,
    Email,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Groups {
    Table,
    Id,
    Name,
    Slug,
    WarnLimit,
    BlockLimit,
    AccountNumber,
    Email,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    GroupId,
    Name,
    ShortName,
    Slug,
    AccountType,
    OwnerId,
    Active,
    Blocked,
    IgnoreBlockLimit,
    GroupAccount,
}

#[derive(DeriveIden)]
enum RoleAccounts {
    Table,
    Id,
    GroupId,
    Role,
    AccountId,
}

#[derive(DeriveIden)]
enum Settlements {
    Table,
    Id,
    GroupId,
    Date,
    Comment,
    Closed,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    GroupId,
    SettlementId,
    Date,
    LastModified,
    State,
}

#[derive(DeriveIden)]
enum TransactionEntries {
    Table,
    Id,
    TransactionId,
    AccountId,
    Debit,
    Credit,
}

#[derive(DeriveIden)]
enum TransactionLogs {
    Table,
    Id,
    TransactionId,
    LogType,
    Timestamp,
    UserId,
    Message,
}
