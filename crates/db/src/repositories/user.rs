//! User repository for database operations.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tally_core::ledger::LedgerError;
use tally_shared::types::UserId;
use tracing::info;

use super::error::db_err;
use super::store::find_user;
use crate::entities::users;

/// User repository for the members and actors referenced by the ledger.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<users::Model>, LedgerError> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Gets a user by ID.
    ///
    /// # Errors
    ///
    /// - `LedgerError::UserNotFound` if no such user exists
    /// - `LedgerError::Database` if the query fails
    pub async fn get(&self, id: UserId) -> Result<users::Model, LedgerError> {
        find_user(&self.db, id).await
    }

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Conflict` if the username is taken
    /// - `LedgerError::Database` if the insert fails
    pub async fn create(
        &self,
        username: &str,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<users::Model, LedgerError> {
        if self.find_by_username(username).await?.is_some() {
            return Err(LedgerError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }

        let user = users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            username: Set(username.to_string()),
            full_name: Set(full_name.map(str::to_string)),
            email: Set(email.map(str::to_string)),
            created_at: Set(Utc::now()),
        };
        let user = user.insert(&self.db).await.map_err(db_err)?;
        info!(user_id = %user.id, username, "User created");
        Ok(user)
    }

    /// Returns the user named `username`, creating it if needed.
    ///
    /// The flag is true if the user was created by this call. A concurrent
    /// creation of the same username returns the stored user.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn get_or_create(
        &self,
        username: &str,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<(users::Model, bool), LedgerError> {
        if let Some(user) = self.find_by_username(username).await? {
            return Ok((user, false));
        }
        match self.create(username, full_name, email).await {
            Ok(user) => Ok((user, true)),
            Err(LedgerError::Conflict(message)) => self
                .find_by_username(username)
                .await?
                .map(|user| (user, false))
                .ok_or(LedgerError::Conflict(message)),
            Err(err) => Err(err),
        }
    }
}
