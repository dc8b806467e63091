//! Notifier writing member notifications to the application log.

use tally_core::notify::{Notification, Notifier};
use tracing::info;

/// Delivers notifications as structured log events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        info!(user = %notification.user, message = %notification.message, "Notification");
    }
}
