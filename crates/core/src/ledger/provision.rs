//! Default accounts created for new groups and members.

use tally_shared::types::{AccountId, GroupId, UserId};

use super::group::{Account, slugify};
use super::types::{AccountType, Role};

/// A group account every group starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultAccount {
    /// Role the account is bound to.
    pub role: Role,
    /// Display name.
    pub name: &'static str,
    /// Slug within the group.
    pub slug: &'static str,
    /// Account type.
    pub account_type: AccountType,
}

impl DefaultAccount {
    /// Builds the account for `group_id`.
    #[must_use]
    pub fn build(&self, group_id: GroupId) -> Account {
        Account {
            id: AccountId::new(),
            group_id,
            name: self.name.to_string(),
            short_name: self.name.to_string(),
            slug: self.slug.to_string(),
            account_type: self.account_type,
            owner: None,
            active: true,
            blocked: false,
            ignore_block_limit: false,
            group_account: true,
        }
    }
}

/// Accounts created together with a group that owns none yet.
pub const DEFAULT_ACCOUNTS: [DefaultAccount; 2] = [
    DefaultAccount {
        role: Role::Bank,
        name: "Bank",
        slug: "bank",
        account_type: AccountType::Asset,
    },
    DefaultAccount {
        role: Role::Cash,
        name: "Cash",
        slug: "cash",
        account_type: AccountType::Asset,
    },
];

/// Returns true if a group with `existing_accounts` accounts still needs its
/// default accounts.
#[must_use]
pub const fn needs_provisioning(existing_accounts: u64) -> bool {
    existing_accounts == 0
}

/// Builds the default accounts for a group, paired with their roles.
#[must_use]
pub fn default_accounts(group_id: GroupId) -> Vec<(Role, Account)> {
    DEFAULT_ACCOUNTS
        .iter()
        .map(|default| (default.role, default.build(group_id)))
        .collect()
}

/// Field values for a member account created on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccountDefaults {
    /// Display name.
    pub name: String,
    /// Short display name.
    pub short_name: String,
    /// Slug within the group.
    pub slug: String,
    /// Account type.
    pub account_type: AccountType,
}

impl UserAccountDefaults {
    /// Derives the defaults for a member. The full name is used for display
    /// when present, the username otherwise.
    #[must_use]
    pub fn for_member(username: &str, full_name: Option<&str>) -> Self {
        let name = full_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(username);
        Self {
            name: name.to_string(),
            short_name: username.to_string(),
            slug: slugify(username),
            account_type: AccountType::Liability,
        }
    }

    /// Builds the account for `owner` in `group_id`.
    #[must_use]
    pub fn build(self, group_id: GroupId, owner: UserId) -> Account {
        Account {
            id: AccountId::new(),
            group_id,
            name: self.name,
            short_name: self.short_name,
            slug: self.slug,
            account_type: self.account_type,
            owner: Some(owner),
            active: true,
            blocked: false,
            ignore_block_limit: false,
            group_account: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_only_for_empty_groups() {
        assert!(needs_provisioning(0));
        assert!(!needs_provisioning(1));
        assert!(!needs_provisioning(2));
    }

    #[test]
    fn test_default_accounts() {
        let group = GroupId::new();
        let accounts = default_accounts(group);
        assert_eq!(accounts.len(), 2);

        let (role, bank) = &accounts[0];
        assert_eq!(*role, Role::Bank);
        assert_eq!(bank.slug, "bank");
        assert_eq!(bank.account_type, AccountType::Asset);
        assert!(bank.group_account);
        assert_eq!(bank.group_id, group);

        let (role, cash) = &accounts[1];
        assert_eq!(*role, Role::Cash);
        assert_eq!(cash.slug, "cash");
        assert_ne!(bank.id, cash.id);
    }

    #[test]
    fn test_member_defaults() {
        let defaults = UserAccountDefaults::for_member("Jane.Doe", Some("Jane Doe"));
        assert_eq!(defaults.name, "Jane Doe");
        assert_eq!(defaults.short_name, "Jane.Doe");
        assert_eq!(defaults.slug, "jane-doe");
        assert_eq!(defaults.account_type, AccountType::Liability);

        let fallback = UserAccountDefaults::for_member("bob", Some("  "));
        assert_eq!(fallback.name, "bob");

        let owner = UserId::new();
        let account = fallback.build(GroupId::new(), owner);
        assert_eq!(account.owner, Some(owner));
        assert!(account.is_user_account());
    }
}
