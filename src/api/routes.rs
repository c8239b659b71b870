use axum::{
    middleware,
    routing::{delete, get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth_middleware;

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
///
/// Everything under /api/v1 requires a bearer token; /health does not.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Catalog
        .route(
            "/titles",
            get(handlers::list_titles).post(handlers::create_title),
        )
        .route("/titles/:id", get(handlers::get_title))
        // Watchlist
        .route("/watchlist", get(handlers::get_watchlist))
        .route(
            "/watchlist/:title_id",
            put(handlers::update_watchlist_entry).delete(handlers::remove_watchlist_entry),
        )
        // Recommendations
        .route("/recommendations", get(handlers::get_recommendations))
        // Reminders
        .route(
            "/reminders",
            get(handlers::list_reminders).post(handlers::create_reminder),
        )
        .route("/reminders/:id", delete(handlers::dismiss_reminder))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
