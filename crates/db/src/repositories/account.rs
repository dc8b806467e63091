//! Account repository: account records, member provisioning and balances.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use tally_core::alerts::{BalanceAlert, balance_alerts};
use tally_core::ledger::balance::{
    AccountStanding, BalanceBasis, evaluate_standings, fold_balances, signed_balance,
};
use tally_core::ledger::provision::UserAccountDefaults;
use tally_core::ledger::{Account, LedgerError, LedgerScope};
use tally_shared::types::{AccountId, GroupId, UserId};
use tracing::info;

use super::convert::{account_active_model, account_from_model, group_from_model};
use super::error::db_err;
use super::store::{account_balance, find_account, find_group, find_user, ledger_lines};
use crate::entities::accounts;

/// Which accounts of a group to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountFilter {
    /// Every account.
    All,
    /// Accounts held by members.
    Members,
    /// Accounts held by the group itself.
    GroupAccounts,
}

/// Repository for accounts and their balances.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// - `LedgerError::EmptySlug` if the slug is blank
    /// - `LedgerError::GroupNotFound` / `UserNotFound` for unknown references
    /// - `LedgerError::Conflict` if the slug or the owner is already used in
    ///   the group
    /// - `LedgerError::Database` if the insert fails
    pub async fn create(&self, account: &Account) -> Result<Account, LedgerError> {
        account.validate()?;
        let txn = self.db.begin().await.map_err(db_err)?;

        find_group(&txn, account.group_id).await?;
        if let Some(owner) = account.owner {
            find_user(&txn, owner).await?;
        }

        let slug_taken = accounts::Entity::find()
            .filter(accounts::Column::GroupId.eq(account.group_id.into_inner()))
            .filter(accounts::Column::Slug.eq(account.slug.as_str()))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if slug_taken > 0 {
            return Err(LedgerError::Conflict(format!(
                "account slug '{}' is already used in this group",
                account.slug
            )));
        }
        if let Some(owner) = account.owner {
            let owner_taken = accounts::Entity::find()
                .filter(accounts::Column::GroupId.eq(account.group_id.into_inner()))
                .filter(accounts::Column::OwnerId.eq(owner.into_inner()))
                .count(&txn)
                .await
                .map_err(db_err)?;
            if owner_taken > 0 {
                return Err(LedgerError::Conflict(format!(
                    "user {owner} already has an account in this group"
                )));
            }
        }

        let model = account_active_model(account)
            .insert(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(
            account_id = %account.id,
            group_id = %account.group_id,
            slug = %account.slug,
            "Account created"
        );
        Ok(account_from_model(model))
    }

    /// Returns the member account of `owner` in a group, creating it with
    /// `defaults` if it does not exist. Idempotent.
    ///
    /// The flag is true if the account was created by this call. When a
    /// concurrent call creates it first, the stored account is returned.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub async fn get_or_create_user_account(
        &self,
        group_id: GroupId,
        owner: UserId,
        defaults: UserAccountDefaults,
    ) -> Result<(Account, bool), LedgerError> {
        if let Some(existing) = self.find_by_owner(group_id, owner).await? {
            return Ok((existing, false));
        }
        let account = defaults.build(group_id, owner);
        match self.create(&account).await {
            Ok(created) => Ok((created, true)),
            Err(LedgerError::Conflict(message)) => self
                .find_by_owner(group_id, owner)
                .await?
                .map(|existing| (existing, false))
                .ok_or(LedgerError::Conflict(message)),
            Err(err) => Err(err),
        }
    }

    /// Saves the editable attributes of an existing account.
    ///
    /// # Errors
    ///
    /// - `LedgerError::EmptySlug` if the slug is blank
    /// - `LedgerError::AccountNotFound` if the account does not exist
    /// - `LedgerError::GroupMismatch` if `account` names another group than
    ///   the stored one
    /// - `LedgerError::Conflict` if the new slug or owner collides
    /// - `LedgerError::Database` if the update fails
    pub async fn update(&self, account: &Account) -> Result<Account, LedgerError> {
        account.validate()?;
        let stored = find_account(&self.db, account.id).await?;
        if stored.group_id != account.group_id.into_inner() {
            return Err(LedgerError::GroupMismatch {
                account_id: account.id,
                group_id: account.group_id,
            });
        }

        let mut active = account_active_model(account);
        active.group_id = NotSet;
        let model = active
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(account_from_model(model))
    }

    /// Sets or clears the manual block of an account.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountNotFound` if the account does not exist
    /// - `LedgerError::Database` if the update fails
    pub async fn set_blocked(&self, id: AccountId, blocked: bool) -> Result<Account, LedgerError> {
        let mut account = self.get(id).await?;
        account.blocked = blocked;
        let account = self.update(&account).await?;
        info!(account_id = %id, blocked, "Account block changed");
        Ok(account)
    }

    /// Gets an account by ID.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountNotFound` if no such account exists
    /// - `LedgerError::Database` if the query fails
    pub async fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        find_account(&self.db, id).await.map(account_from_model)
    }

    /// Finds an account by its slug within a group.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountNotFound` if no account has this slug
    /// - `LedgerError::Database` if the query fails
    pub async fn find_by_slug(
        &self,
        group_id: GroupId,
        slug: &str,
    ) -> Result<Account, LedgerError> {
        accounts::Entity::find()
            .filter(accounts::Column::GroupId.eq(group_id.into_inner()))
            .filter(accounts::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(account_from_model)
            .ok_or_else(|| LedgerError::AccountNotFound(slug.to_string()))
    }

    /// Finds the account `owner` holds in a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_owner(
        &self,
        group_id: GroupId,
        owner: UserId,
    ) -> Result<Option<Account>, LedgerError> {
        Ok(accounts::Entity::find()
            .filter(accounts::Column::GroupId.eq(group_id.into_inner()))
            .filter(accounts::Column::OwnerId.eq(owner.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(account_from_model))
    }

    /// Lists the accounts of a group ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        group_id: GroupId,
        filter: AccountFilter,
    ) -> Result<Vec<Account>, LedgerError> {
        let mut query =
            accounts::Entity::find().filter(accounts::Column::GroupId.eq(group_id.into_inner()));
        query = match filter {
            AccountFilter::All => query,
            AccountFilter::Members => query.filter(accounts::Column::GroupAccount.eq(false)),
            AccountFilter::GroupAccounts => query.filter(accounts::Column::GroupAccount.eq(true)),
        };
        Ok(query
            .order_by_asc(accounts::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(account_from_model)
            .collect())
    }

    // ========================================================================
    // Balances
    // ========================================================================

    /// Sum of `debit - credit` over committed entries, optionally only of
    /// transactions dated on or before `as_of`.
    ///
    /// # Errors
    ///
    /// - `LedgerError::AccountNotFound` if the account does not exist
    /// - `LedgerError::Database` if the query fails
    pub async fn balance(
        &self,
        id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<Decimal, LedgerError> {
        find_account(&self.db, id).await?;
        account_balance(&self.db, id, BalanceBasis::Confirmed, as_of).await
    }

    /// Same as [`Self::balance`] without a date limit.
    ///
    /// # Errors
    ///
    /// See [`Self::balance`].
    pub async fn confirmed_balance(&self, id: AccountId) -> Result<Decimal, LedgerError> {
        self.balance(id, None).await
    }

    /// Balance including pending transactions.
    ///
    /// # Errors
    ///
    /// See [`Self::balance`].
    pub async fn future_balance(&self, id: AccountId) -> Result<Decimal, LedgerError> {
        find_account(&self.db, id).await?;
        account_balance(&self.db, id, BalanceBasis::Future, None).await
    }

    /// Balance as the account holder reads it.
    ///
    /// # Errors
    ///
    /// See [`Self::balance`].
    pub async fn signed_balance(&self, id: AccountId) -> Result<Decimal, LedgerError> {
        let account = self.get(id).await?;
        let balance = account_balance(&self.db, id, BalanceBasis::Confirmed, None).await?;
        Ok(signed_balance(&account, balance))
    }

    /// Balance, signed balance and limit status of one account.
    ///
    /// # Errors
    ///
    /// See [`Self::balance`].
    pub async fn standing(&self, id: AccountId) -> Result<AccountStanding, LedgerError> {
        let account = self.get(id).await?;
        let group = group_from_model(find_group(&self.db, account.group_id).await?);
        let balance = account_balance(&self.db, id, BalanceBasis::Confirmed, None).await?;
        Ok(AccountStanding::evaluate(&account, &group.limits, balance))
    }

    /// Balances of every account in a group, from a single entry query.
    /// Accounts without entries are absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn group_balances(
        &self,
        group_id: GroupId,
        basis: BalanceBasis,
    ) -> Result<HashMap<AccountId, Decimal>, LedgerError> {
        let lines = ledger_lines(&self.db, LedgerScope::Group(group_id), basis).await?;
        Ok(fold_balances(&lines, basis, None))
    }

    /// Standings of every account in a group, in account-name order.
    ///
    /// # Errors
    ///
    /// - `LedgerError::GroupNotFound` if the group does not exist
    /// - `LedgerError::Database` if a query fails
    pub async fn group_standings(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<(Account, AccountStanding)>, LedgerError> {
        let group = group_from_model(find_group(&self.db, group_id).await?);
        let accounts = self.list(group_id, AccountFilter::All).await?;
        let balances = self
            .group_balances(group_id, BalanceBasis::Confirmed)
            .await?;
        let standings = evaluate_standings(&accounts, &group.limits, &balances);
        Ok(accounts.into_iter().zip(standings).collect())
    }

    /// Alerts for the members of a group whose balance is under the warn or
    /// block limit.
    ///
    /// # Errors
    ///
    /// - `LedgerError::GroupNotFound` if the group does not exist
    /// - `LedgerError::Database` if a query fails
    pub async fn balance_alerts(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<BalanceAlert>, LedgerError> {
        let group = group_from_model(find_group(&self.db, group_id).await?);
        let (accounts, standings): (Vec<_>, Vec<_>) =
            self.group_standings(group_id).await?.into_iter().unzip();
        Ok(balance_alerts(&accounts, &group.limits, &standings))
    }
}
