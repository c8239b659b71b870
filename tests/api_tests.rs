use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use anitrack_api::api::{create_router, AppState};
use anitrack_api::models::{Title, TitleType, User};
use anitrack_api::services::RecommendationEngine;
use anitrack_api::store::Store;

struct TestApp {
    server: TestServer,
    store: Store,
    user_id: Uuid,
    token: String,
}

async fn spawn_app() -> TestApp {
    let store = Store::new();
    let engine = Arc::new(RecommendationEngine::new(
        store.clone(),
        None,
        Duration::from_secs(1),
    ));
    let server = TestServer::new(create_router(AppState::new(store.clone(), engine))).unwrap();

    let user = store
        .insert_user(User::new("alice".to_string()))
        .await
        .unwrap();
    let token = store.issue_token(user.id).await.unwrap();

    TestApp {
        server,
        store,
        user_id: user.id,
        token,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

async fn seed_title(store: &Store, name: &str, genres: &[&str], episodes: u32) -> Title {
    let title = Title::new(
        name.to_string(),
        TitleType::Tv,
        genres.iter().map(|g| g.to_string()).collect(),
    )
    .with_episodes(episodes)
    .with_release_date(Utc::now() - chrono::Duration::weeks(4));
    store.insert_title(title).await.unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    let app = spawn_app().await;

    let response = app.server.get("/api/v1/titles").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/v1/titles")
        .add_header(AUTHORIZATION, bearer("not-a-real-token"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_mutation_is_admin_only() {
    let app = spawn_app().await;

    let body = json!({
        "name": "Cowboy Bebop",
        "title_type": "tv",
        "genres": ["Action", "Sci-Fi"],
        "episode_count": 26
    });

    let response = app
        .server
        .post("/api/v1/titles")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&body)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let admin = app
        .store
        .insert_user(User::admin("root".to_string()))
        .await
        .unwrap();
    let admin_token = app.store.issue_token(admin.id).await.unwrap();

    let response = app
        .server
        .post("/api/v1/titles")
        .add_header(AUTHORIZATION, bearer(&admin_token))
        .json(&body)
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["name"], "Cowboy Bebop");
    assert_eq!(created["average_rating"], 0.0);
}

#[tokio::test]
async fn test_watchlist_flow_updates_derived_rating() {
    let app = spawn_app().await;
    let title = seed_title(&app.store, "Frieren", &["Fantasy"], 28).await;

    // Out-of-range rating is rejected with no state change
    let response = app
        .server
        .put(&format!("/api/v1/watchlist/{}", title.id))
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&json!({ "rating": 11 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .put(&format!("/api/v1/watchlist/{}", title.id))
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&json!({ "status": "completed", "rating": 9 }))
        .await;
    response.assert_status_ok();
    let entry: serde_json::Value = response.json();
    assert_eq!(entry["status"], "completed");
    // Completion pins the episode counter to the total
    assert_eq!(entry["episodes_watched"], 28);

    // The stored title now carries the derived mean
    let response = app
        .server
        .get(&format!("/api/v1/titles/{}", title.id))
        .add_header(AUTHORIZATION, bearer(&app.token))
        .await;
    response.assert_status_ok();
    let stored: serde_json::Value = response.json();
    assert_eq!(stored["average_rating"], 9.0);
    assert_eq!(stored["total_ratings"], 1);
    assert_eq!(stored["popularity"], 1);

    let response = app
        .server
        .get("/api/v1/watchlist")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .await;
    response.assert_status_ok();
    let watchlist: Vec<serde_json::Value> = response.json();
    assert_eq!(watchlist.len(), 1);
    assert_eq!(watchlist[0]["title"]["name"], "Frieren");
}

#[tokio::test]
async fn test_episode_progress_beyond_total_rejected() {
    let app = spawn_app().await;
    let title = seed_title(&app.store, "Short Show", &["Comedy"], 12).await;

    let response = app
        .server
        .put(&format!("/api/v1/watchlist/{}", title.id))
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&json!({ "episodes_watched": 13 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations_cold_start_is_popular() {
    let app = spawn_app().await;

    // Rated catalog: another user's ratings back the popular tier
    let rater = app
        .store
        .insert_user(User::new("rater".to_string()))
        .await
        .unwrap();
    for (name, rating) in [("Great A", 9), ("Great B", 8), ("Weak", 5)] {
        let title = seed_title(&app.store, name, &["Action"], 12).await;
        app.store
            .update_watch_entry(
                rater.id,
                title.id,
                anitrack_api::store::WatchEntryPatch {
                    rating: Some(rating),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let response = app
        .server
        .get("/api/v1/recommendations")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["source"], "popular");
    assert!(body["user_profile"].is_null());
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 2);
    for rec in recommendations {
        assert!(rec["title"]["average_rating"].as_f64().unwrap() >= 8.0);
        assert_eq!(rec["source"], "popular");
    }
}

#[tokio::test]
async fn test_recommendations_exclude_watch_history() {
    let app = spawn_app().await;

    let watched = seed_title(&app.store, "Watched", &["Action"], 12).await;
    let fresh = seed_title(&app.store, "Fresh", &["Action"], 12).await;

    // A second user's rating gives the candidate an average above the floor
    let rater = app
        .store
        .insert_user(User::new("rater".to_string()))
        .await
        .unwrap();
    app.store
        .update_watch_entry(
            rater.id,
            fresh.id,
            anitrack_api::store::WatchEntryPatch {
                rating: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    app.store
        .update_watch_entry(
            app.user_id,
            watched.id,
            anitrack_api::store::WatchEntryPatch {
                status: Some(anitrack_api::models::WatchStatus::Completed),
                rating: Some(9),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = app
        .server
        .get("/api/v1/recommendations")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    // Without an AI provider the source can never be "ai"
    assert_eq!(body["source"], "algorithm");
    let summary = &body["user_profile"];
    assert_eq!(summary["avg_rating"], 9.0);
    assert_eq!(summary["completion_rate"], 100);

    for rec in body["recommendations"].as_array().unwrap() {
        assert_ne!(rec["title"]["id"], json!(watched.id.to_string()));
    }
}

#[tokio::test]
async fn test_reminder_lifecycle() {
    let app = spawn_app().await;
    let title = seed_title(&app.store, "Frieren", &["Fantasy"], 28).await;

    // Fire time computed from the premiere and the weekly cadence
    let response = app
        .server
        .post("/api/v1/reminders")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&json!({
            "type": "next_episode",
            "title_id": title.id,
            "episode_number": 3
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let reminder: serde_json::Value = response.json();
    assert_eq!(reminder["is_active"], true);
    assert_eq!(reminder["is_sent"], false);
    let reminder_id = reminder["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .get("/api/v1/reminders")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .await;
    response.assert_status_ok();
    let reminders: Vec<serde_json::Value> = response.json();
    assert_eq!(reminders.len(), 1);

    // Dismissing removes it from the active listing
    let response = app
        .server
        .delete(&format!("/api/v1/reminders/{}", reminder_id))
        .add_header(AUTHORIZATION, bearer(&app.token))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = app
        .server
        .get("/api/v1/reminders")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .await;
    let reminders: Vec<serde_json::Value> = response.json();
    assert!(reminders.is_empty());
}

#[tokio::test]
async fn test_reminder_validation() {
    let app = spawn_app().await;
    let title = seed_title(&app.store, "Short Show", &["Comedy"], 12).await;

    // custom_schedule type needs a schedule
    let response = app
        .server
        .post("/api/v1/reminders")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&json!({ "type": "custom_schedule", "title_id": title.id }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Episode number beyond the total is rejected
    let response = app
        .server
        .post("/api/v1/reminders")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&json!({
            "type": "next_episode",
            "title_id": title.id,
            "episode_number": 40
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Unknown title is a 404, not a crash
    let response = app
        .server
        .post("/api/v1/reminders")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&json!({
            "type": "anime_start",
            "title_id": Uuid::new_v4()
        }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_custom_schedule_reminder_gets_future_fire_time() {
    let app = spawn_app().await;
    let title = seed_title(&app.store, "Weekly Show", &["Drama"], 24).await;

    let response = app
        .server
        .post("/api/v1/reminders")
        .add_header(AUTHORIZATION, bearer(&app.token))
        .json(&json!({
            "type": "custom_schedule",
            "title_id": title.id,
            "custom_schedule": { "day_of_week": 5, "time": "20:00:00" }
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let reminder: serde_json::Value = response.json();
    let remind_at: chrono::DateTime<Utc> =
        reminder["remind_at"].as_str().unwrap().parse().unwrap();
    assert!(remind_at > Utc::now());
    assert!(remind_at <= Utc::now() + chrono::Duration::days(7));
}
