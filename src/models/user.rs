use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Progress state of a watchlist entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Plan,
    Watching,
    Completed,
    OnHold,
    Dropped,
}

/// A user's personal progress record against one title
///
/// Invariant: `episodes_watched` never exceeds the title's episode count.
/// Reaching the final episode, or an explicit move to `Completed`, stamps
/// `finished_at` and pins the episode counter to the total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEntry {
    pub title_id: Uuid,
    pub status: WatchStatus,
    pub episodes_watched: u32,
    /// Personal score, 1-10
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WatchEntry {
    pub fn new(title_id: Uuid) -> Self {
        Self {
            title_id,
            status: WatchStatus::Plan,
            episodes_watched: 0,
            rating: None,
            started_at: None,
            finished_at: None,
            notes: None,
        }
    }

    /// Applies a status change, enforcing the completion transition
    pub fn set_status(&mut self, status: WatchStatus, episode_count: Option<u32>) {
        let now = Utc::now();
        match status {
            WatchStatus::Completed => {
                if let Some(total) = episode_count {
                    self.episodes_watched = total;
                }
                if self.finished_at.is_none() {
                    self.finished_at = Some(now);
                }
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            WatchStatus::Watching => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            _ => {}
        }
        self.status = status;
    }

    /// Advances the episode counter, completing the entry on the last episode
    pub fn set_progress(&mut self, episodes: u32, episode_count: Option<u32>) -> AppResult<()> {
        if let Some(total) = episode_count {
            if episodes > total {
                return Err(AppError::InvalidInput(format!(
                    "episodes_watched {} exceeds episode count {}",
                    episodes, total
                )));
            }
        }

        self.episodes_watched = episodes;
        if episodes > 0 && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }

        if episode_count == Some(episodes) && episodes > 0 {
            self.set_status(WatchStatus::Completed, episode_count);
        }

        Ok(())
    }

    /// Sets the personal score, rejecting values outside 1-10
    pub fn set_rating(&mut self, rating: u8) -> AppResult<()> {
        if !(1..=10).contains(&rating) {
            return Err(AppError::InvalidInput(format!(
                "rating must be between 1 and 10, got {}",
                rating
            )));
        }
        self.rating = Some(rating);
        Ok(())
    }
}

/// An account with its embedded watch history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    pub watchlist: Vec<WatchEntry>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            is_admin: false,
            watchlist: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn admin(username: String) -> Self {
        Self {
            is_admin: true,
            ..Self::new(username)
        }
    }

    pub fn entry(&self, title_id: Uuid) -> Option<&WatchEntry> {
        self.watchlist.iter().find(|e| e.title_id == title_id)
    }

    pub fn entry_mut(&mut self, title_id: Uuid) -> Option<&mut WatchEntry> {
        self.watchlist.iter_mut().find(|e| e.title_id == title_id)
    }
}
