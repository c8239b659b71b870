use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::{rngs::StdRng, SeedableRng};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ProfileSummary, Recommendation, RecommendationResponse, RecommendationSource, Title,
    TitleType, UserProfile,
};
use crate::services::ai::{HistoryItem, SuggestionProvider, SuggestionRequest};
use crate::store::Store;

/// Maximum recommendations returned by any tier
const MAX_RECOMMENDATIONS: usize = 12;

/// Genres considered when matching candidates against the profile
const TOP_GENRE_COUNT: usize = 5;

/// Title types considered a format preference
const TOP_TYPE_COUNT: usize = 2;

/// Rating floor for the cold-start popular tier
const POPULAR_MIN_RATING: f64 = 8.0;

/// Absolute rating floor for fallback candidates
const CANDIDATE_RATING_FLOOR: f64 = 6.0;

const DIVERSITY_BONUS: f64 = 10.0;
const DIVERSITY_PROBABILITY: f64 = 0.3;

/// Generates personalized watch recommendations
///
/// Degrades through three tiers rather than ever failing for lack of
/// personalization data: an external AI recommender when configured and
/// healthy, a deterministic weighted scorer over the catalog otherwise, and
/// the community's highest-rated titles for users with no usable history.
/// Stateless per request; the taste profile is rebuilt from the live
/// watchlist every time.
pub struct RecommendationEngine {
    store: Store,
    provider: Option<Arc<dyn SuggestionProvider>>,
    ai_timeout: Duration,
}

impl RecommendationEngine {
    pub fn new(
        store: Store,
        provider: Option<Arc<dyn SuggestionProvider>>,
        ai_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            ai_timeout,
        }
    }

    /// Produces up to 12 titles the user has not already logged
    ///
    /// Only a store failure is an error; every external failure downgrades
    /// to the next tier.
    pub async fn recommend(&self, user_id: Uuid) -> AppResult<RecommendationResponse> {
        let history = self.store.watchlist_with_titles(user_id).await?;

        if history.is_empty() {
            tracing::info!(user_id = %user_id, "Empty watch history, using popular tier");
            return self.popular(None).await;
        }

        let mut profile = UserProfile::default();
        let mut seen: HashSet<Uuid> = HashSet::new();
        for (entry, title) in &history {
            seen.insert(entry.title_id);
            if let Some(title) = title {
                profile.observe(entry, title);
            }
        }

        // Every logged title was deleted from the catalog; nothing to profile
        if profile.is_empty() {
            tracing::info!(user_id = %user_id, "No resolvable history, using popular tier");
            return self.popular(None).await;
        }

        let summary = profile.summary();

        if let Some(provider) = &self.provider {
            match self
                .ai_tier(provider.as_ref(), &profile, &history, &seen)
                .await
            {
                Ok(recommendations) if !recommendations.is_empty() => {
                    tracing::info!(
                        user_id = %user_id,
                        count = recommendations.len(),
                        provider = provider.name(),
                        "AI tier succeeded"
                    );
                    return Ok(RecommendationResponse {
                        source: RecommendationSource::Ai,
                        recommendations,
                        user_profile: Some(summary),
                    });
                }
                Ok(_) => {
                    tracing::info!(
                        user_id = %user_id,
                        "AI tier resolved no catalog titles, falling back"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "AI tier failed, falling back"
                    );
                }
            }
        }

        let mut rng = StdRng::from_entropy();
        let recommendations = self.algorithmic_tier(&profile, &seen, &mut rng).await?;

        if recommendations.is_empty() {
            tracing::info!(user_id = %user_id, "No scored candidates, using popular tier");
            return self.popular(Some(summary)).await;
        }

        Ok(RecommendationResponse {
            source: RecommendationSource::Algorithm,
            recommendations,
            user_profile: Some(summary),
        })
    }

    /// Primary tier: delegate to the external recommender
    ///
    /// Bounded by the configured timeout; names that do not resolve against
    /// the catalog, or resolve to already-seen titles, are dropped.
    async fn ai_tier(
        &self,
        provider: &dyn SuggestionProvider,
        profile: &UserProfile,
        history: &[(crate::models::WatchEntry, Option<Title>)],
        seen: &HashSet<Uuid>,
    ) -> AppResult<Vec<Recommendation>> {
        let request = SuggestionRequest {
            top_genres: profile.top_genres(TOP_GENRE_COUNT),
            top_types: profile.top_types(TOP_TYPE_COUNT),
            mean_rating: profile.mean_rating(),
            completion_rate: profile.completion_rate(),
            history: history
                .iter()
                .filter_map(|(entry, title)| {
                    title.as_ref().map(|t| HistoryItem {
                        title: t.name.clone(),
                        status: entry.status,
                        rating: entry.rating,
                    })
                })
                .collect(),
            limit: MAX_RECOMMENDATIONS,
        };

        let suggestions = tokio::time::timeout(self.ai_timeout, provider.suggest(&request))
            .await
            .map_err(|_| AppError::ExternalApi("AI suggestion call timed out".to_string()))??;

        let mut recommendations = Vec::new();
        for suggestion in suggestions {
            let Some(title) = self.store.find_title_by_name(&suggestion.title).await? else {
                tracing::debug!(title = %suggestion.title, "AI suggestion not in catalog");
                continue;
            };
            if seen.contains(&title.id) {
                continue;
            }
            recommendations.push(Recommendation {
                title,
                reason: suggestion.reason,
                confidence: suggestion.confidence.clamp(0.0, 1.0),
                source: RecommendationSource::Ai,
            });
            if recommendations.len() == MAX_RECOMMENDATIONS {
                break;
            }
        }

        Ok(recommendations)
    }

    /// Deterministic tier: weighted scoring over unseen catalog titles
    ///
    /// Public so tests can drive it with a seeded RNG.
    pub async fn algorithmic_tier(
        &self,
        profile: &UserProfile,
        seen: &HashSet<Uuid>,
        rng: &mut (impl Rng + Send),
    ) -> AppResult<Vec<Recommendation>> {
        let top_genres = profile.top_genres(TOP_GENRE_COUNT);
        let top_types = profile.top_types(TOP_TYPE_COUNT);
        let mean_rating = profile.mean_rating();
        let rating_floor = CANDIDATE_RATING_FLOOR.max(mean_rating - 1.0);

        let mut scored: Vec<(f64, Title)> = self
            .store
            .all_titles()
            .await?
            .into_iter()
            .filter(|t| !seen.contains(&t.id))
            .filter(|t| t.average_rating >= rating_floor)
            .map(|t| {
                let score = score_title(&t, &top_genres, &top_types, mean_rating, rng);
                (score, t)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.name.cmp(&b.1.name))
        });
        scored.truncate(MAX_RECOMMENDATIONS);

        Ok(scored
            .into_iter()
            .map(|(score, title)| Recommendation {
                title,
                reason: reason_for_score(score).to_string(),
                confidence: (score / 100.0).clamp(0.0, 1.0),
                source: RecommendationSource::Algorithm,
            })
            .collect())
    }

    /// Last tier: globally highest-rated titles
    async fn popular(&self, summary: Option<ProfileSummary>) -> AppResult<RecommendationResponse> {
        let recommendations = self
            .store
            .top_rated(POPULAR_MIN_RATING, MAX_RECOMMENDATIONS)
            .await?
            .into_iter()
            .map(|title| Recommendation {
                confidence: (title.average_rating / 10.0).clamp(0.0, 1.0),
                reason: "Highly rated across the community".to_string(),
                source: RecommendationSource::Popular,
                title,
            })
            .collect();

        Ok(RecommendationResponse {
            source: RecommendationSource::Popular,
            recommendations,
            user_profile: summary,
        })
    }
}

/// Weighted score out of 100 for one candidate, plus an occasional
/// diversity bonus
///
/// Components: genre overlap with the top-5 genres (40), alignment between
/// the candidate's average rating and the user's mean (25), format
/// preference (15), rating-count popularity (10). Candidates carrying a
/// genre outside the user's top-5 receive a +10 bonus roughly 30% of the
/// time, nudging the list away from a pure filter bubble.
pub fn score_title(
    title: &Title,
    top_genres: &[String],
    top_types: &[TitleType],
    mean_rating: f64,
    rng: &mut impl Rng,
) -> f64 {
    let genre_matches = title
        .genres
        .iter()
        .filter(|g| top_genres.contains(g))
        .count();
    let mut score = genre_matches as f64 / top_genres.len().max(1) as f64 * 40.0;

    score += ((3.0 - (title.average_rating - mean_rating).abs()) / 3.0).max(0.0) * 25.0;

    if top_types.contains(&title.title_type) {
        score += 15.0;
    }

    score += (f64::from(title.total_ratings) / 1000.0).min(1.0) * 10.0;

    if title.has_genre_outside(top_genres) && rng.gen::<f64>() < DIVERSITY_PROBABILITY {
        score += DIVERSITY_BONUS;
    }

    score
}

/// Maps a score band to the reason shown to the user
fn reason_for_score(score: f64) -> &'static str {
    if score > 60.0 {
        "Matches your favorite genres"
    } else if score > 45.0 {
        "Close to how you usually rate"
    } else if score > 30.0 {
        "One of the formats you watch most"
    } else {
        "A discovery outside your usual picks"
    }
}
