use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{TitleType, WatchStatus};

/// Structured preference prompt handed to the external recommender
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionRequest {
    pub top_genres: Vec<String>,
    pub top_types: Vec<TitleType>,
    pub mean_rating: f64,
    pub completion_rate: f64,
    pub history: Vec<HistoryItem>,
    pub limit: usize,
}

/// One watch-history line of context for the prompt
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub title: String,
    pub status: WatchStatus,
    pub rating: Option<u8>,
}

/// A candidate returned by the external recommender
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AiSuggestion {
    #[serde(alias = "name")]
    pub title: String,
    pub reason: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

/// External recommendation capability
///
/// Implementations may fail for any reason (timeout, malformed output,
/// quota); the engine treats every failure as recoverable and falls through
/// to the deterministic tier.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> AppResult<Vec<AiSuggestion>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Recommender backed by a hosted text-generation endpoint
#[derive(Clone)]
pub struct HttpSuggestionProvider {
    http_client: HttpClient,
    api_url: String,
    api_key: String,
}

impl HttpSuggestionProvider {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            api_key,
        }
    }

    /// Extracts candidates from whatever shape the model answered with
    ///
    /// Accepts either a bare JSON array or an object wrapping one under
    /// `recommendations`. Anything else is a malformed response.
    fn parse_candidates(value: serde_json::Value) -> AppResult<Vec<AiSuggestion>> {
        let items = match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => match map.remove("recommendations") {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    return Err(AppError::ExternalApi(
                        "Response has no recommendations array".to_string(),
                    ))
                }
            },
            _ => {
                return Err(AppError::ExternalApi(
                    "Response is not a recommendations array".to_string(),
                ))
            }
        };

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<AiSuggestion>(item).map_err(|e| {
                    AppError::ExternalApi(format!("Malformed recommendation entry: {}", e))
                })
            })
            .map(|result| {
                result.map(|mut s| {
                    s.confidence = s.confidence.clamp(0.0, 1.0);
                    s
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SuggestionProvider for HttpSuggestionProvider {
    async fn suggest(&self, request: &SuggestionRequest) -> AppResult<Vec<AiSuggestion>> {
        let response = self
            .http_client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Recommender returned status {}: {}",
                status, body
            )));
        }

        let value: serde_json::Value = response.json().await?;
        let suggestions = Self::parse_candidates(value)?;

        tracing::info!(
            candidates = suggestions.len(),
            provider = self.name(),
            "AI suggestions received"
        );

        Ok(suggestions)
    }

    fn name(&self) -> &'static str {
        "http_suggestion_provider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let value = json!([
            {"title": "Steins;Gate", "reason": "Time travel like your favorites", "confidence": 0.9},
            {"name": "Monster", "reason": "Slow-burn thriller", "confidence": 0.7}
        ]);

        let suggestions = HttpSuggestionProvider::parse_candidates(value).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].title, "Steins;Gate");
        assert_eq!(suggestions[1].title, "Monster");
    }

    #[test]
    fn test_parse_wrapped_object() {
        let value = json!({
            "recommendations": [
                {"title": "Hyouka", "reason": "Quiet mysteries", "confidence": 0.8}
            ]
        });

        let suggestions = HttpSuggestionProvider::parse_candidates(value).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "Hyouka");
    }

    #[test]
    fn test_parse_clamps_confidence() {
        let value = json!([
            {"title": "A", "reason": "r", "confidence": 7.5},
            {"title": "B", "reason": "r", "confidence": -1.0},
            {"title": "C", "reason": "r"}
        ]);

        let suggestions = HttpSuggestionProvider::parse_candidates(value).unwrap();
        assert_eq!(suggestions[0].confidence, 1.0);
        assert_eq!(suggestions[1].confidence, 0.0);
        assert_eq!(suggestions[2].confidence, 0.5);
    }

    #[test]
    fn test_parse_rejects_non_array_shapes() {
        assert!(HttpSuggestionProvider::parse_candidates(json!("just text")).is_err());
        assert!(HttpSuggestionProvider::parse_candidates(json!({"data": []})).is_err());
        assert!(HttpSuggestionProvider::parse_candidates(json!([{"reason": "no title"}])).is_err());
    }
}
