use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use anitrack_api::api::{create_router, AppState};
use anitrack_api::config::Config;
use anitrack_api::models::User;
use anitrack_api::services::{
    HttpSuggestionProvider, LogNotifier, RecommendationEngine, ReminderScheduler,
    SuggestionProvider,
};
use anitrack_api::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = Store::new();

    // Bootstrap operator account; real session issuance belongs to the
    // external auth service
    let admin = store.insert_user(User::admin("admin".to_string())).await?;
    let token = store.issue_token(admin.id).await?;
    tracing::info!(token = %token, "Bootstrap admin token issued");

    let provider: Option<Arc<dyn SuggestionProvider>> = config.ai_api_key.clone().map(|key| {
        Arc::new(HttpSuggestionProvider::new(config.ai_api_url.clone(), key))
            as Arc<dyn SuggestionProvider>
    });
    if provider.is_none() {
        tracing::info!("No AI API key configured, recommendations use the algorithmic tier");
    }

    let engine = Arc::new(RecommendationEngine::new(
        store.clone(),
        provider,
        Duration::from_secs(config.ai_timeout_secs),
    ));

    let scheduler = Arc::new(ReminderScheduler::new(
        store.clone(),
        Arc::new(LogNotifier),
        Duration::from_secs(config.reminder_interval_secs),
    ));
    tokio::spawn(scheduler.run());

    let state = AppState::new(store, engine);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
