//! Settlement repository.
//!
//! Closing a settlement freezes every transaction attached to it: entries,
//! state and attachment can no longer change until it is reopened.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tally_core::ledger::{LedgerError, Settlement};
use tally_shared::types::{GroupId, SettlementId};
use tracing::info;

use super::convert::settlement_from_model;
use super::error::db_err;
use super::store::{find_group, find_settlement};
use crate::entities::settlements;

/// Repository for settlements.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    db: DatabaseConnection,
}

impl SettlementRepository {
    /// Creates a new settlement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an open settlement in a group.
    ///
    /// # Errors
    ///
    /// - `LedgerError::GroupNotFound` if the group does not exist
    /// - `LedgerError::Database` if the insert fails
    pub async fn create(
        &self,
        group_id: GroupId,
        date: NaiveDate,
        comment: &str,
    ) -> Result<Settlement, LedgerError> {
        find_group(&self.db, group_id).await?;
        let model = settlements::ActiveModel {
            id: Set(SettlementId::new().into_inner()),
            group_id: Set(group_id.into_inner()),
            date: Set(date),
            comment: Set(comment.trim().to_string()),
            closed: Set(false),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        info!(settlement_id = %model.id, group_id = %group_id, %date, "Settlement created");
        Ok(settlement_from_model(model))
    }

    /// Gets a settlement by ID.
    ///
    /// # Errors
    ///
    /// - `LedgerError::SettlementNotFound` if no such settlement exists
    /// - `LedgerError::Database` if the query fails
    pub async fn get(&self, id: SettlementId) -> Result<Settlement, LedgerError> {
        find_settlement(&self.db, id).await.map(settlement_from_model)
    }

    /// Lists the settlements of a group, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, group_id: GroupId) -> Result<Vec<Settlement>, LedgerError> {
        Ok(settlements::Entity::find()
            .filter(settlements::Column::GroupId.eq(group_id.into_inner()))
            .order_by_desc(settlements::Column::Date)
            .order_by_desc(settlements::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(settlement_from_model)
            .collect())
    }

    /// Closes a settlement. Closing a closed settlement is a no-op.
    ///
    /// # Errors
    ///
    /// - `LedgerError::SettlementNotFound` if no such settlement exists
    /// - `LedgerError::Database` if the update fails
    pub async fn close(&self, id: SettlementId) -> Result<Settlement, LedgerError> {
        self.set_closed(id, true).await
    }

    /// Reopens a closed settlement.
    ///
    /// # Errors
    ///
    /// Same as [`Self::close`].
    pub async fn reopen(&self, id: SettlementId) -> Result<Settlement, LedgerError> {
        self.set_closed(id, false).await
    }

    async fn set_closed(&self, id: SettlementId, closed: bool) -> Result<Settlement, LedgerError> {
        let model = find_settlement(&self.db, id).await?;
        if model.closed == closed {
            return Ok(settlement_from_model(model));
        }
        let mut active: settlements::ActiveModel = model.into();
        active.closed = Set(closed);
        let model = active.update(&self.db).await.map_err(db_err)?;

        info!(settlement_id = %id, closed, "Settlement status changed");
        Ok(settlement_from_model(model))
    }
}
