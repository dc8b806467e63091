//! Balance alerts for members whose balance is under a group limit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, UserId};

use crate::ledger::balance::AccountStanding;
use crate::ledger::group::{Account, BalanceLimits};
use crate::notify::Notification;

/// Which limit an account is under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    /// Under the block limit, or manually blocked.
    Blocked,
    /// Under the warn limit.
    Warning,
}

impl AlertKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Blocked => "_block limit_",
            Self::Warning => "_warning limit_",
        }
    }
}

/// An alert for one member account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAlert {
    /// The account concerned.
    pub account_id: AccountId,
    /// The member to alert.
    pub owner: UserId,
    /// Which limit was crossed.
    pub kind: AlertKind,
    /// The account's signed balance.
    pub balance: Decimal,
    /// The crossed limit. Zero for a manual block without a block limit.
    pub limit: Decimal,
}

impl BalanceAlert {
    /// Renders the alert text sent to the member.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Your current account balance of {:.2}, is below the {} {:.2}",
            self.balance,
            self.kind.label(),
            self.limit
        )
    }

    /// Wraps the alert into a notification for its owner.
    #[must_use]
    pub fn to_notification(&self) -> Notification {
        Notification {
            user: self.owner,
            message: self.message(),
        }
    }
}

/// Builds the alerts for a group from its accounts and their standings.
///
/// Only active accounts with an owner are considered. A blocked account gets
/// a block alert only, otherwise an account needing a warning gets a
/// warning alert. Standings are matched to accounts by id.
#[must_use]
pub fn balance_alerts(
    accounts: &[Account],
    limits: &BalanceLimits,
    standings: &[AccountStanding],
) -> Vec<BalanceAlert> {
    standings
        .iter()
        .filter_map(|standing| {
            let account = accounts.iter().find(|a| a.id == standing.account_id)?;
            if !account.active {
                return None;
            }
            let owner = account.owner?;
            let (kind, limit) = if standing.blocked {
                (AlertKind::Blocked, limits.block_limit)
            } else if standing.needs_warning {
                (AlertKind::Warning, limits.warn_limit)
            } else {
                return None;
            };
            Some(BalanceAlert {
                account_id: account.id,
                owner,
                kind,
                balance: standing.signed_balance,
                limit: limit.map(Decimal::from).unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::balance::evaluate_standings;
    use crate::ledger::types::AccountType;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tally_shared::types::GroupId;

    fn member(group_id: GroupId, slug: &str) -> Account {
        Account {
            id: AccountId::new(),
            group_id,
            name: slug.to_string(),
            short_name: slug.to_string(),
            slug: slug.to_string(),
            account_type: AccountType::Liability,
            owner: Some(UserId::new()),
            active: true,
            blocked: false,
            ignore_block_limit: false,
            group_account: false,
        }
    }

    #[test]
    fn test_alert_messages() {
        let alert = BalanceAlert {
            account_id: AccountId::new(),
            owner: UserId::new(),
            kind: AlertKind::Blocked,
            balance: dec!(-150),
            limit: dec!(0),
        };
        assert_eq!(
            alert.message(),
            "Your current account balance of -150.00, is below the _block limit_ 0.00"
        );

        let warning = BalanceAlert {
            kind: AlertKind::Warning,
            balance: dec!(20.5),
            limit: dec!(50),
            ..alert
        };
        assert_eq!(
            warning.message(),
            "Your current account balance of 20.50, is below the _warning limit_ 50.00"
        );
        assert_eq!(warning.to_notification().user, warning.owner);
    }

    #[test]
    fn test_alerts_for_group() {
        let group = GroupId::new();
        let limits = BalanceLimits {
            warn_limit: Some(50),
            block_limit: Some(0),
        };
        let blocked = member(group, "blocked");
        let warned = member(group, "warned");
        let fine = member(group, "fine");
        let mut inactive = member(group, "inactive");
        inactive.active = false;
        let accounts = vec![blocked.clone(), warned.clone(), fine.clone(), inactive.clone()];

        // member balances are credit-normal: raw balance is the negated signed balance
        let balances: HashMap<_, _> = [
            (blocked.id, dec!(150)),
            (warned.id, dec!(-20)),
            (fine.id, dec!(-500)),
            (inactive.id, dec!(1000)),
        ]
        .into_iter()
        .collect();
        let standings = evaluate_standings(&accounts, &limits, &balances);

        let alerts = balance_alerts(&accounts, &limits, &standings);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].account_id, blocked.id);
        assert_eq!(alerts[0].kind, AlertKind::Blocked);
        assert_eq!(alerts[0].balance, dec!(-150));
        assert_eq!(alerts[1].account_id, warned.id);
        assert_eq!(alerts[1].kind, AlertKind::Warning);
        assert_eq!(alerts[1].limit, dec!(50));
    }
}
