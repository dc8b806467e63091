//! Enum columns stored as short strings.
//!
//! The string values match `as_str()` of the corresponding `tally-core`
//! enums, and the `From` impls below convert between the two.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use tally_core::ledger::types as ledger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AccountType {
    #[sea_orm(string_value = "asset")]
    Asset,
    #[sea_orm(string_value = "liability")]
    Liability,
    #[sea_orm(string_value = "equity")]
    Equity,
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "expense")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Role {
    #[sea_orm(string_value = "bank")]
    Bank,
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "sale")]
    Sale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransactionState {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "committed")]
    Committed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LogType {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "committed")]
    Committed,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

macro_rules! mirror_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$name> for ledger::$name {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => Self::$variant,)+
                }
            }
        }

        impl From<ledger::$name> for $name {
            fn from(value: ledger::$name) -> Self {
                match value {
                    $(ledger::$name::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(AccountType { Asset, Liability, Equity, Income, Expense });
mirror_enum!(Role { Bank, Cash, Sale });
mirror_enum!(TransactionState { New, Pending, Committed, Rejected });
mirror_enum!(LogType { Pending, Committed, Rejected });
