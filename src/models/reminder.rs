use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Title;

/// What a reminder is anchored to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    NextEpisode,
    AnimeStart,
    CustomSchedule,
}

/// Weekly slot for custom-schedule reminders
///
/// `day_of_week` is 0-6 with 0 = Sunday, matching the wire format clients
/// already send.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub day_of_week: u8,
    pub time: NaiveTime,
}

impl WeeklySchedule {
    pub fn validate(&self) -> AppResult<()> {
        if self.day_of_week > 6 {
            return Err(AppError::InvalidInput(format!(
                "day_of_week must be 0-6, got {}",
                self.day_of_week
            )));
        }
        Ok(())
    }

    /// The next matching slot strictly after `after`
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let after_dow = after.weekday().num_days_from_sunday() as i64;
        let mut days_ahead = (self.day_of_week as i64 - after_dow).rem_euclid(7);

        let mut candidate = Utc
            .from_utc_datetime(&(after.date_naive() + Duration::days(days_ahead)).and_time(self.time));
        if candidate <= after {
            days_ahead += 7;
            candidate = Utc.from_utc_datetime(
                &(after.date_naive() + Duration::days(days_ahead)).and_time(self.time),
            );
        }
        candidate
    }
}

/// A scheduled notification tied to an episode or weekly slot
///
/// `title_id` is the catalog id stored as an opaque string, not a strict
/// foreign key: the referenced title may be deleted out from under a pending
/// reminder, and the scheduler tolerates that per record.
///
/// Lifecycle: pending (`is_active`, `!is_sent`) fires into sent
/// (`is_sent = true`), or is dismissed by the user (`is_active = false`).
/// Both are terminal for the record; a fired custom-schedule reminder chains
/// by spawning a fresh pending successor one week out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title_id: String,
    pub reminder_type: ReminderType,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub custom_schedule: Option<WeeklySchedule>,
    pub remind_at: DateTime<Utc>,
    pub is_active: bool,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        user_id: Uuid,
        title_id: String,
        reminder_type: ReminderType,
        remind_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title_id,
            reminder_type,
            episode_number: None,
            custom_schedule: None,
            remind_at,
            is_active: true,
            is_sent: false,
            created_at: Utc::now(),
        }
    }

    /// Whether this reminder should fire at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_sent && self.remind_at <= now
    }

    /// The next occurrence in a recurring chain
    ///
    /// Only custom-schedule reminders recur; everything else fires once.
    pub fn successor(&self) -> Option<Reminder> {
        if self.reminder_type != ReminderType::CustomSchedule {
            return None;
        }
        Some(Reminder {
            id: Uuid::new_v4(),
            remind_at: self.remind_at + Duration::days(7),
            is_active: true,
            is_sent: false,
            created_at: Utc::now(),
            ..self.clone()
        })
    }

    /// Renders the notification text for this reminder against its title
    pub fn notification_message(&self, title: &Title) -> String {
        match self.reminder_type {
            ReminderType::NextEpisode => format!(
                "Episode {} of {} airing soon",
                self.episode_number.unwrap_or(1),
                title.name
            ),
            ReminderType::AnimeStart => format!("{} is starting to air", title.name),
            ReminderType::CustomSchedule => format!("Time to watch {}", title.name),
        }
    }
}
