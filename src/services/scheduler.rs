use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Reminder;
use crate::services::notifier::Notifier;
use crate::store::Store;

/// Periodic background task that fires due reminders
///
/// Each tick claims every pending reminder whose fire time has passed (the
/// claim flips `is_sent` in the same conditional update, so a record fires
/// at most once even under concurrent ticks), dispatches a notification per
/// record, and regenerates custom-schedule reminders one week ahead.
pub struct ReminderScheduler {
    store: Store,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    tick_guard: Mutex<()>,
}

impl ReminderScheduler {
    pub fn new(store: Store, notifier: Arc<dyn Notifier>, interval: Duration) -> Self {
        Self {
            store,
            notifier,
            interval,
            tick_guard: Mutex::new(()),
        }
    }

    /// Runs the scheduler loop forever
    ///
    /// Call with `tokio::spawn` to run in the background. A tick that fails
    /// is logged and retried from scratch on the next interval.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Reminder scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.run_tick().await {
                Ok(Some(0)) => {}
                Ok(Some(dispatched)) => {
                    tracing::info!(dispatched, "Reminder tick completed");
                }
                Ok(None) => {
                    tracing::debug!("Previous tick still running, skipped");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Reminder tick failed, retrying next interval");
                }
            }
        }
    }

    /// Processes one scheduler tick
    ///
    /// Returns `Ok(None)` when a previous tick is still running (overlapping
    /// ticks are skipped, not queued), otherwise the number of reminders
    /// dispatched. A batch-fetch error aborts only this cycle.
    pub async fn run_tick(&self) -> AppResult<Option<usize>> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            return Ok(None);
        };

        let due = self.store.claim_due_reminders(Utc::now()).await?;
        if due.is_empty() {
            return Ok(Some(0));
        }

        tracing::info!(count = due.len(), "Processing due reminders");

        let mut dispatched = 0;
        for reminder in due {
            // One bad record never halts the batch
            match self.process(&reminder).await {
                Ok(()) => dispatched += 1,
                Err(e) => {
                    tracing::warn!(
                        reminder_id = %reminder.id,
                        error = %e,
                        "Skipping reminder"
                    );
                }
            }
        }

        Ok(Some(dispatched))
    }

    /// Dispatches one claimed reminder and regenerates its successor
    ///
    /// The reminder is already marked sent by the claim; a delivery failure
    /// is logged and not retried (at-most-once).
    async fn process(&self, reminder: &Reminder) -> AppResult<()> {
        let user = self.store.get_user(reminder.user_id).await?;

        let title_id = Uuid::parse_str(&reminder.title_id).map_err(|_| {
            AppError::NotFound(format!(
                "Reminder {} references malformed title id {}",
                reminder.id, reminder.title_id
            ))
        })?;
        let title = self.store.get_title(title_id).await?;

        let message = reminder.notification_message(&title);
        if let Err(e) = self.notifier.deliver(user.id, &message).await {
            tracing::warn!(
                reminder_id = %reminder.id,
                user_id = %user.id,
                error = %e,
                "Notification delivery failed, reminder stays sent"
            );
        }

        if let Some(successor) = reminder.successor() {
            let successor = self.store.insert_reminder(successor).await?;
            tracing::debug!(
                reminder_id = %reminder.id,
                successor_id = %successor.id,
                remind_at = %successor.remind_at,
                "Recurring reminder regenerated"
            );
        }

        Ok(())
    }
}
