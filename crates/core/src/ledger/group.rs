//! Groups, their accounts and settlements.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, GroupId, SettlementId, UserId};

use super::error::LedgerError;
use super::types::AccountType;

/// Balance thresholds configured on a group.
///
/// `None` means "no limit". `Some(0)` is a real, strict limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLimits {
    /// Member accounts below this signed balance get a warning.
    pub warn_limit: Option<i64>,
    /// Member accounts below this signed balance are blocked.
    pub block_limit: Option<i64>,
}

/// An organization unit owning accounts and transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group ID.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Unique, non-empty slug.
    pub slug: String,
    /// Balance thresholds.
    pub limits: BalanceLimits,
    /// Bank account number, digits only.
    pub account_number: Option<String>,
    /// Contact e-mail.
    pub email: Option<String>,
}

impl Group {
    /// Creates a group without limits or contact details.
    #[must_use]
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            slug: slug.into(),
            limits: BalanceLimits::default(),
            account_number: None,
            email: None,
        }
    }

    /// Checks the field rules that must hold before the group is saved.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::EmptySlug` if the slug is blank.
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_slug(&self.slug)
    }

    /// Returns the bank account number formatted for display.
    #[must_use]
    pub fn account_number_display(&self) -> Option<String> {
        self.account_number.as_deref().map(format_account_number)
    }
}

/// Formats an 11-digit bank account number as `1234.56.78901`.
///
/// Anything that is not exactly 11 ASCII digits is returned unchanged.
#[must_use]
pub fn format_account_number(number: &str) -> String {
    if number.len() == 11 && number.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}.{}.{}", &number[..4], &number[4..6], &number[6..])
    } else {
        number.to_string()
    }
}

/// A ledger account belonging to exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning group.
    pub group_id: GroupId,
    /// Display name.
    pub name: String,
    /// Short display name.
    pub short_name: String,
    /// Slug, unique within the group.
    pub slug: String,
    /// Account type.
    pub account_type: AccountType,
    /// Member owning the account, for user accounts.
    pub owner: Option<UserId>,
    /// Inactive accounts are skipped by balance alerts.
    pub active: bool,
    /// Manual block, independent of the balance.
    pub blocked: bool,
    /// Exempts the account from the group's block and warn limits.
    pub ignore_block_limit: bool,
    /// True for accounts held by the group itself (bank, cash).
    pub group_account: bool,
}

impl Account {
    /// Returns true if the account is held by a member.
    #[must_use]
    pub const fn is_user_account(&self) -> bool {
        !self.group_account
    }

    /// Checks the field rules that must hold before the account is saved.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::EmptySlug` if the slug is blank.
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_slug(&self.slug)
    }
}

/// A grouping of transactions that can be closed against further edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Settlement ID.
    pub id: SettlementId,
    /// Owning group.
    pub group_id: GroupId,
    /// Settlement date.
    pub date: NaiveDate,
    /// Free-text comment.
    pub comment: String,
    /// Closed settlements freeze their transactions.
    pub closed: bool,
}

fn validate_slug(slug: &str) -> Result<(), LedgerError> {
    if slug.trim().is_empty() {
        return Err(LedgerError::EmptySlug);
    }
    Ok(())
}

/// Turns a free-form name into a slug: lowercase ASCII letters, digits, `-`
/// and `_`, with runs of anything else collapsed into a single `-`.
#[must_use]
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
