use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::models::{
    RecommendationResponse, Reminder, ReminderType, Title, TitleType, WatchEntry, WeeklySchedule,
};
use crate::store::{TitlePage, TitleQuery, WatchEntryPatch};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateTitleRequest {
    pub name: String,
    pub title_type: TitleType,
    #[serde(default)]
    pub genres: Vec<String>,
    pub synopsis: Option<String>,
    pub episode_count: Option<u32>,
    pub release_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct WatchlistItemResponse {
    #[serde(flatten)]
    pub entry: WatchEntry,
    /// `None` when the title has been removed from the catalog
    pub title: Option<Title>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    #[serde(rename = "type")]
    pub reminder_type: ReminderType,
    pub title_id: Uuid,
    pub episode_number: Option<u32>,
    pub custom_schedule: Option<WeeklySchedule>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// List the catalog with optional genre/type/search filters
pub async fn list_titles(
    State(state): State<AppState>,
    Query(query): Query<TitleQuery>,
) -> AppResult<Json<TitlePage>> {
    let page = state.store.list_titles(&query).await?;
    Ok(Json(page))
}

/// Fetch one catalog entry
pub async fn get_title(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Title>> {
    let title = state.store.get_title(id).await?;
    Ok(Json(title))
}

/// Add a title to the catalog (admin only)
pub async fn create_title(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(request): Json<CreateTitleRequest>,
) -> AppResult<(StatusCode, Json<Title>)> {
    let user = state.store.get_user(user_id).await?;
    if !user.is_admin {
        return Err(AppError::Forbidden(
            "Only admins can modify the catalog".to_string(),
        ));
    }
    if request.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Title name cannot be empty".to_string()));
    }

    let mut title = Title::new(request.name, request.title_type, request.genres);
    title.synopsis = request.synopsis;
    title.episode_count = request.episode_count;
    title.release_date = request.release_date;

    let title = state.store.insert_title(title).await?;

    tracing::info!(title_id = %title.id, name = %title.name, "Title added to catalog");

    Ok((StatusCode::CREATED, Json(title)))
}

/// The current user's watch history with titles resolved
pub async fn get_watchlist(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> AppResult<Json<Vec<WatchlistItemResponse>>> {
    let items = state
        .store
        .watchlist_with_titles(user_id)
        .await?
        .into_iter()
        .map(|(entry, title)| WatchlistItemResponse { entry, title })
        .collect();
    Ok(Json(items))
}

/// Create or update the watchlist entry for one title
pub async fn update_watchlist_entry(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(title_id): Path<Uuid>,
    Json(patch): Json<WatchEntryPatch>,
) -> AppResult<Json<WatchEntry>> {
    let entry = state
        .store
        .update_watch_entry(user_id, title_id, patch)
        .await?;
    Ok(Json(entry))
}

/// Drop a title from the watchlist
pub async fn remove_watchlist_entry(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(title_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.store.remove_watch_entry(user_id, title_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Personalized recommendations for the current user
pub async fn get_recommendations(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> AppResult<Json<RecommendationResponse>> {
    let response = state.engine.recommend(user_id).await?;
    Ok(Json(response))
}

/// Schedule a reminder, computing its fire time from the request type
pub async fn create_reminder(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Json(request): Json<CreateReminderRequest>,
) -> AppResult<(StatusCode, Json<Reminder>)> {
    let title = state.store.get_title(request.title_id).await?;

    let remind_at = match request.reminder_type {
        ReminderType::CustomSchedule => {
            let schedule = request.custom_schedule.ok_or_else(|| {
                AppError::InvalidInput(
                    "custom_schedule is required for custom_schedule reminders".to_string(),
                )
            })?;
            schedule.validate()?;
            schedule.next_occurrence(Utc::now())
        }
        ReminderType::AnimeStart => title.release_date.ok_or_else(|| {
            AppError::InvalidInput(format!("{} has no scheduled start date", title.name))
        })?,
        ReminderType::NextEpisode => {
            let episode = request.episode_number.ok_or_else(|| {
                AppError::InvalidInput(
                    "episode_number is required for next_episode reminders".to_string(),
                )
            })?;
            if episode == 0 {
                return Err(AppError::InvalidInput(
                    "episode_number must be at least 1".to_string(),
                ));
            }
            if let Some(total) = title.episode_count {
                if episode > total {
                    return Err(AppError::InvalidInput(format!(
                        "{} only has {} episodes",
                        title.name, total
                    )));
                }
            }
            let start = title.release_date.ok_or_else(|| {
                AppError::InvalidInput(format!("{} has no scheduled start date", title.name))
            })?;
            // Weekly airing cadence: episode N lands N-1 weeks after premiere
            start + Duration::weeks(i64::from(episode) - 1)
        }
    };

    let mut reminder = Reminder::new(
        user_id,
        title.id.to_string(),
        request.reminder_type,
        remind_at,
    );
    reminder.episode_number = request.episode_number;
    if request.reminder_type == ReminderType::CustomSchedule {
        reminder.custom_schedule = request.custom_schedule;
    }

    let reminder = state.store.insert_reminder(reminder).await?;

    tracing::info!(
        reminder_id = %reminder.id,
        user_id = %user_id,
        remind_at = %reminder.remind_at,
        "Reminder scheduled"
    );

    Ok((StatusCode::CREATED, Json(reminder)))
}

/// The current user's active reminders
pub async fn list_reminders(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> AppResult<Json<Vec<Reminder>>> {
    let reminders = state.store.reminders_for_user(user_id).await?;
    Ok(Json(reminders))
}

/// Dismiss a reminder without firing it
pub async fn dismiss_reminder(
    State(state): State<AppState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.store.dismiss_reminder(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
