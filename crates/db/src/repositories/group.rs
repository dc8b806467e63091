//! Group repository.
//!
//! Saving a group that owns no accounts yet provisions its default Bank and
//! Cash accounts in the same database transaction.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tally_core::ledger::provision::{default_accounts, needs_provisioning};
use tally_core::ledger::{Account, Group, LedgerError, Role};
use tally_shared::types::{AccountId, GroupId};
use tracing::info;

use super::convert::{account_active_model, account_from_model, group_from_model};
use super::error::db_err;
use super::store::{find_account, find_group, role_account};
use crate::entities::{accounts, groups, role_accounts, sea_orm_active_enums as enums};

/// Repository for groups and their role accounts.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    db: DatabaseConnection,
}

impl GroupRepository {
    /// Creates a new group repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts or updates a group.
    ///
    /// If the group owns no accounts afterwards, the default accounts are
    /// created and bound to their roles. Returns the accounts created by this
    /// call, which is empty for every save after the first.
    ///
    /// # Errors
    ///
    /// - `LedgerError::EmptySlug` if the slug is blank
    /// - `LedgerError::Conflict` if another group uses the slug
    /// - `LedgerError::Database` if a database operation fails
    pub async fn save(&self, group: &Group) -> Result<Vec<Account>, LedgerError> {
        group.validate()?;

        let txn = self.db.begin().await.map_err(db_err)?;

        let taken = groups::Entity::find()
            .filter(groups::Column::Slug.eq(group.slug.as_str()))
            .filter(groups::Column::Id.ne(group.id.into_inner()))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if taken > 0 {
            return Err(LedgerError::Conflict(format!(
                "group slug '{}' is already taken",
                group.slug
            )));
        }

        let existing = groups::Entity::find_by_id(group.id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?;
        match existing {
            Some(model) => {
                let mut active: groups::ActiveModel = model.into();
                active.name = Set(group.name.clone());
                active.slug = Set(group.slug.clone());
                active.warn_limit = Set(group.limits.warn_limit);
                active.block_limit = Set(group.limits.block_limit);
                active.account_number = Set(group.account_number.clone());
                active.email = Set(group.email.clone());
                active.update(&txn).await.map_err(db_err)?;
            }
            None => {
                groups::ActiveModel {
                    id: Set(group.id.into_inner()),
                    name: Set(group.name.clone()),
                    slug: Set(group.slug.clone()),
                    warn_limit: Set(group.limits.warn_limit),
                    block_limit: Set(group.limits.block_limit),
                    account_number: Set(group.account_number.clone()),
                    email: Set(group.email.clone()),
                    created_at: Set(chrono::Utc::now()),
                }
                .insert(&txn)
                .await
                .map_err(db_err)?;
            }
        }

        let account_count = accounts::Entity::find()
            .filter(accounts::Column::GroupId.eq(group.id.into_inner()))
            .count(&txn)
            .await
            .map_err(db_err)?;

        let mut created = Vec::new();
        if needs_provisioning(account_count) {
            for (role, account) in default_accounts(group.id) {
                account_active_model(&account)
                    .insert(&txn)
                    .await
                    .map_err(db_err)?;
                role_accounts::ActiveModel {
                    id: Set(uuid::Uuid::now_v7()),
                    group_id: Set(group.id.into_inner()),
                    role: Set(role.into()),
                    account_id: Set(account.id.into_inner()),
                }
                .insert(&txn)
                .await
                .map_err(db_err)?;
                created.push(account);
            }
        }

        txn.commit().await.map_err(db_err)?;

        if !created.is_empty() {
            info!(
                group_id = %group.id,
                slug = %group.slug,
                accounts = created.len(),
                "Default accounts provisioned"
            );
        }
        Ok(created)
    }

    /// Gets a group by ID.
    ///
    /// # Errors
    ///
    /// - `LedgerError::GroupNotFound` if no such group exists
    /// - `LedgerError::Database` if the query fails
    pub async fn get(&self, id: GroupId) -> Result<Group, LedgerError> {
        find_group(&self.db, id).await.map(group_from_model)
    }

    /// Finds a group by slug.
    ///
    /// # Errors
    ///
    /// - `LedgerError::GroupNotFound` if no group has this slug
    /// - `LedgerError::Database` if the query fails
    pub async fn find_by_slug(&self, slug: &str) -> Result<Group, LedgerError> {
        groups::Entity::find()
            .filter(groups::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(group_from_model)
            .ok_or_else(|| LedgerError::GroupNotFound(slug.to_string()))
    }

    /// Lists all groups ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Group>, LedgerError> {
        Ok(groups::Entity::find()
            .order_by_asc(groups::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(group_from_model)
            .collect())
    }

    /// Returns the account bound to `role` in a group.
    ///
    /// # Errors
    ///
    /// - `LedgerError::RoleAccountNotFound` if the role is unbound
    /// - `LedgerError::Database` if the query fails
    pub async fn role_account(
        &self,
        group_id: GroupId,
        role: Role,
    ) -> Result<Account, LedgerError> {
        role_account(&self.db, group_id, role)
            .await
            .map(account_from_model)
    }

    /// Binds `role` in a group to `account_id`, replacing any earlier binding.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountNotFound` if the account does not exist
    /// - `LedgerError::GroupMismatch` if it belongs to another group
    /// - `LedgerError::Database` if a database operation fails
    pub async fn set_role_account(
        &self,
        group_id: GroupId,
        role: Role,
        account_id: AccountId,
    ) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let account = find_account(&txn, account_id).await?;
        if account.group_id != group_id.into_inner() {
            return Err(LedgerError::GroupMismatch {
                account_id,
                group_id,
            });
        }

        let existing = role_accounts::Entity::find()
            .filter(role_accounts::Column::GroupId.eq(group_id.into_inner()))
            .filter(role_accounts::Column::Role.eq(enums::Role::from(role)))
            .one(&txn)
            .await
            .map_err(db_err)?;
        match existing {
            Some(binding) => {
                let mut active: role_accounts::ActiveModel = binding.into();
                active.account_id = Set(account_id.into_inner());
                active.update(&txn).await.map_err(db_err)?;
            }
            None => {
                role_accounts::ActiveModel {
                    id: Set(uuid::Uuid::now_v7()),
                    group_id: Set(group_id.into_inner()),
                    role: Set(role.into()),
                    account_id: Set(account_id.into_inner()),
                }
                .insert(&txn)
                .await
                .map_err(db_err)?;
            }
        }

        txn.commit().await.map_err(db_err)?;
        info!(group_id = %group_id, role = %role, account_id = %account_id, "Role account bound");
        Ok(())
    }
}
