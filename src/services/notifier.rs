use uuid::Uuid;

use crate::error::AppResult;

/// Delivery channel for reminder notifications
///
/// The scheduler's responsibility ends at invoking this; it does not retry
/// on failure (at-most-once semantics).
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, user_id: Uuid, message: &str) -> AppResult<()>;
}

/// In-app notifier that records deliveries to the log stream
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, user_id: Uuid, message: &str) -> AppResult<()> {
        tracing::info!(
            user_id = %user_id,
            message = %message,
            "Reminder notification delivered"
        );
        Ok(())
    }
}
