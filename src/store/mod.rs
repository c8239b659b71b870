use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Reminder, Title, TitleType, User, WatchEntry, WatchStatus};

/// Sort order for title listings
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TitleSort {
    #[default]
    Popularity,
    Rating,
    Name,
}

/// Filter/sort/paginate parameters for the title catalog
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleQuery {
    pub genre: Option<String>,
    pub title_type: Option<TitleType>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: TitleSort,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// One page of catalog results
#[derive(Debug, Clone, serde::Serialize)]
pub struct TitlePage {
    pub titles: Vec<Title>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Partial update applied to a watchlist entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchEntryPatch {
    pub status: Option<WatchStatus>,
    pub episodes_watched: Option<u32>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

/// In-process document store over titles, users, and reminders
///
/// Cloneable handle; all collections live behind one `RwLock` so multi-step
/// mutations (watchlist upsert + rating recompute, due-reminder claiming)
/// execute in a single critical section.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    titles: HashMap<Uuid, Title>,
    users: HashMap<Uuid, User>,
    reminders: HashMap<Uuid, Reminder>,
    /// Opaque bearer token -> user id
    sessions: HashMap<String, Uuid>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Titles
    // ------------------------------------------------------------------

    pub async fn insert_title(&self, title: Title) -> AppResult<Title> {
        let mut inner = self.inner.write().await;
        inner.titles.insert(title.id, title.clone());
        Ok(title)
    }

    pub async fn get_title(&self, id: Uuid) -> AppResult<Title> {
        let inner = self.inner.read().await;
        inner
            .titles
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Title {} not found", id)))
    }

    /// Case-insensitive exact name lookup, used to resolve AI suggestions
    pub async fn find_title_by_name(&self, name: &str) -> AppResult<Option<Title>> {
        let inner = self.inner.read().await;
        let needle = name.trim().to_lowercase();
        Ok(inner
            .titles
            .values()
            .find(|t| t.name.to_lowercase() == needle)
            .cloned())
    }

    pub async fn all_titles(&self) -> AppResult<Vec<Title>> {
        let inner = self.inner.read().await;
        Ok(inner.titles.values().cloned().collect())
    }

    /// Filtered, sorted, paginated catalog listing
    pub async fn list_titles(&self, query: &TitleQuery) -> AppResult<TitlePage> {
        let inner = self.inner.read().await;

        let mut titles: Vec<Title> = inner
            .titles
            .values()
            .filter(|t| match &query.genre {
                Some(genre) => t
                    .genres
                    .iter()
                    .any(|g| g.eq_ignore_ascii_case(genre)),
                None => true,
            })
            .filter(|t| match query.title_type {
                Some(title_type) => t.title_type == title_type,
                None => true,
            })
            .filter(|t| match &query.search {
                Some(search) => t.name.to_lowercase().contains(&search.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();

        match query.sort {
            TitleSort::Popularity => titles.sort_by(|a, b| {
                b.popularity
                    .cmp(&a.popularity)
                    .then_with(|| a.name.cmp(&b.name))
            }),
            TitleSort::Rating => titles.sort_by(|a, b| {
                b.average_rating
                    .partial_cmp(&a.average_rating)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.name.cmp(&b.name))
            }),
            TitleSort::Name => titles.sort_by(|a, b| a.name.cmp(&b.name)),
        }

        let total = titles.len();
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);

        let titles = titles
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        Ok(TitlePage {
            titles,
            total,
            page,
            per_page,
        })
    }

    /// Highest-rated titles at or above `min_rating`, best first
    pub async fn top_rated(&self, min_rating: f64, limit: usize) -> AppResult<Vec<Title>> {
        let inner = self.inner.read().await;
        let mut titles: Vec<Title> = inner
            .titles
            .values()
            .filter(|t| t.total_ratings > 0 && t.average_rating >= min_rating)
            .cloned()
            .collect();
        titles.sort_by(|a, b| {
            b.average_rating
                .partial_cmp(&a.average_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        titles.truncate(limit);
        Ok(titles)
    }

    // ------------------------------------------------------------------
    // Users, sessions, watchlists
    // ------------------------------------------------------------------

    pub async fn insert_user(&self, user: User) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> AppResult<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Mints an opaque bearer token for a user
    ///
    /// Token issuance proper belongs to the external auth service; this is
    /// the session table it writes into.
    pub async fn issue_token(&self, user_id: Uuid) -> AppResult<String> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        let token = Uuid::new_v4().simple().to_string();
        inner.sessions.insert(token.clone(), user_id);
        Ok(token)
    }

    pub async fn resolve_token(&self, token: &str) -> AppResult<Option<Uuid>> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(token).copied())
    }

    /// Creates or updates a watchlist entry and keeps derived title fields
    /// consistent: popularity bumps on first add, and the title's average
    /// rating is recomputed whenever the entry's rating changes.
    pub async fn update_watch_entry(
        &self,
        user_id: Uuid,
        title_id: Uuid,
        patch: WatchEntryPatch,
    ) -> AppResult<WatchEntry> {
        let mut inner = self.inner.write().await;

        let episode_count = inner
            .titles
            .get(&title_id)
            .ok_or_else(|| AppError::NotFound(format!("Title {} not found", title_id)))?
            .episode_count;

        // Validate the whole patch up front so a rejected request leaves
        // no partial state behind
        if let Some(rating) = patch.rating {
            if !(1..=10).contains(&rating) {
                return Err(AppError::InvalidInput(format!(
                    "rating must be between 1 and 10, got {}",
                    rating
                )));
            }
        }
        if let (Some(episodes), Some(total)) = (patch.episodes_watched, episode_count) {
            if episodes > total {
                return Err(AppError::InvalidInput(format!(
                    "episodes_watched {} exceeds episode count {}",
                    episodes, total
                )));
            }
        }

        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let is_new = user.entry(title_id).is_none();
        if is_new {
            user.watchlist.push(WatchEntry::new(title_id));
        }
        let entry = user
            .entry_mut(title_id)
            .ok_or_else(|| AppError::Internal("watchlist entry vanished".to_string()))?;

        if let Some(episodes) = patch.episodes_watched {
            entry.set_progress(episodes, episode_count)?;
        }
        if let Some(status) = patch.status {
            entry.set_status(status, episode_count);
        }
        let rating_changed = match patch.rating {
            Some(rating) => {
                let previous = entry.rating;
                entry.set_rating(rating)?;
                previous != Some(rating)
            }
            None => false,
        };
        if let Some(notes) = patch.notes {
            entry.notes = Some(notes);
        }
        let updated = entry.clone();

        if is_new {
            if let Some(title) = inner.titles.get_mut(&title_id) {
                title.popularity += 1;
            }
        }
        if rating_changed {
            Self::recompute_rating(&mut inner, title_id);
        }

        Ok(updated)
    }

    pub async fn remove_watch_entry(&self, user_id: Uuid, title_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let before = user.watchlist.len();
        let had_rating = user.entry(title_id).and_then(|e| e.rating).is_some();
        user.watchlist.retain(|e| e.title_id != title_id);
        if user.watchlist.len() == before {
            return Err(AppError::NotFound(format!(
                "Title {} is not on the watchlist",
                title_id
            )));
        }

        if had_rating {
            Self::recompute_rating(&mut inner, title_id);
        }
        Ok(())
    }

    /// Watch history with title documents resolved
    ///
    /// Entries whose title has been deleted resolve to `None`; callers decide
    /// whether to skip or surface them.
    pub async fn watchlist_with_titles(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<(WatchEntry, Option<Title>)>> {
        let inner = self.inner.read().await;
        let user = inner
            .users
            .get(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        Ok(user
            .watchlist
            .iter()
            .map(|e| (e.clone(), inner.titles.get(&e.title_id).cloned()))
            .collect())
    }

    /// Recomputes a title's stored average from every user's current rating
    fn recompute_rating(inner: &mut StoreInner, title_id: Uuid) {
        let ratings: Vec<f64> = inner
            .users
            .values()
            .filter_map(|u| u.entry(title_id).and_then(|e| e.rating))
            .map(f64::from)
            .collect();

        if let Some(title) = inner.titles.get_mut(&title_id) {
            title.total_ratings = ratings.len() as u32;
            title.average_rating = if ratings.is_empty() {
                0.0
            } else {
                ratings.iter().sum::<f64>() / ratings.len() as f64
            };
        }
    }

    // ------------------------------------------------------------------
    // Reminders
    // ------------------------------------------------------------------

    pub async fn insert_reminder(&self, reminder: Reminder) -> AppResult<Reminder> {
        let mut inner = self.inner.write().await;
        inner.reminders.insert(reminder.id, reminder.clone());
        Ok(reminder)
    }

    /// A user's active reminders, soonest first
    pub async fn reminders_for_user(&self, user_id: Uuid) -> AppResult<Vec<Reminder>> {
        let inner = self.inner.read().await;
        let mut reminders: Vec<Reminder> = inner
            .reminders
            .values()
            .filter(|r| r.user_id == user_id && r.is_active)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| r.remind_at);
        Ok(reminders)
    }

    /// Dismisses a reminder (`is_active` -> false), owner-checked
    pub async fn dismiss_reminder(&self, user_id: Uuid, reminder_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let reminder = inner
            .reminders
            .get_mut(&reminder_id)
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Reminder {} not found", reminder_id)))?;
        reminder.is_active = false;
        Ok(())
    }

    /// Claims every due reminder in one conditional update
    ///
    /// "Due and unsent" and "mark sent" happen inside a single write-lock
    /// critical section, so a record can never be claimed by two scheduler
    /// ticks. Returns the claimed records as they were at claim time.
    pub async fn claim_due_reminders(&self, now: DateTime<Utc>) -> AppResult<Vec<Reminder>> {
        let mut inner = self.inner.write().await;
        let mut claimed = Vec::new();

        for reminder in inner.reminders.values_mut() {
            if reminder.is_due(now) {
                reminder.is_sent = true;
                claimed.push(reminder.clone());
            }
        }

        claimed.sort_by_key(|r| r.remind_at);
        Ok(claimed)
    }

    pub async fn get_reminder(&self, id: Uuid) -> AppResult<Reminder> {
        let inner = self.inner.read().await;
        inner
            .reminders
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Reminder {} not found", id)))
    }
}
