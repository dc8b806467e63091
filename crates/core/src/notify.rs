//! Outgoing member notifications.
//!
//! The ledger decides who is told what; delivering the message (mail, chat,
//! log line) is up to the [`Notifier`] implementation it is handed.

use serde::{Deserialize, Serialize};
use tally_shared::types::UserId;

/// Message sent to members whose account took part in a rejected transaction.
pub const REJECTION_MESSAGE: &str = "A transaction containing your account has been rejected";

/// A message for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient.
    pub user: UserId,
    /// Message text.
    pub message: String,
}

impl Notification {
    /// Builds the rejection notices for `owners`.
    #[must_use]
    pub fn rejections(owners: &[UserId]) -> Vec<Self> {
        owners
            .iter()
            .map(|user| Self {
                user: *user,
                message: REJECTION_MESSAGE.to_string(),
            })
            .collect()
    }
}

/// Delivers notifications to users.
pub trait Notifier: Send + Sync {
    /// Delivers one notification. Delivery failures are the notifier's
    /// concern and never undo ledger changes.
    fn notify(&self, notification: &Notification);
}

/// A notifier that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) {}
}
