use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Title, TitleType, WatchEntry, WatchStatus};

/// Weight added per genre when an entry carries no rating
const UNRATED_GENRE_WEIGHT: f64 = 0.5;

/// Assumed mean when a user has logged titles but rated none of them
const DEFAULT_MEAN_RATING: f64 = 7.0;

/// Which strategy produced a recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    Ai,
    Algorithm,
    Popular,
}

/// A suggested title with the reasoning behind it
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub title: Title,
    pub reason: String,
    /// Strategy confidence in [0, 1]
    pub confidence: f64,
    pub source: RecommendationSource,
}

/// Taste profile aggregated from a user's watch history
///
/// Ephemeral by design: built fresh from the current watchlist on every
/// recommendation request, never persisted or cached.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    genre_weights: HashMap<String, f64>,
    type_counts: HashMap<TitleType, u32>,
    ratings: Vec<f64>,
    completed: usize,
    total: usize,
}

impl UserProfile {
    /// Folds one resolved watch entry into the profile
    ///
    /// A rated entry contributes rating/10 to each of its title's genres;
    /// an unrated one contributes a flat default weight.
    pub fn observe(&mut self, entry: &WatchEntry, title: &Title) {
        let weight = entry
            .rating
            .map(|r| f64::from(r) / 10.0)
            .unwrap_or(UNRATED_GENRE_WEIGHT);

        for genre in &title.genres {
            *self.genre_weights.entry(genre.clone()).or_insert(0.0) += weight;
        }
        *self.type_counts.entry(title.title_type).or_insert(0) += 1;

        if let Some(rating) = entry.rating {
            self.ratings.push(f64::from(rating));
        }
        if entry.status == WatchStatus::Completed {
            self.completed += 1;
        }
        self.total += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn genre_weight(&self, genre: &str) -> f64 {
        self.genre_weights.get(genre).copied().unwrap_or(0.0)
    }

    /// Top `n` genres by accumulated weight, name-ordered on ties
    pub fn top_genres(&self, n: usize) -> Vec<String> {
        let mut genres: Vec<(&String, f64)> = self
            .genre_weights
            .iter()
            .map(|(g, w)| (g, *w))
            .collect();
        genres.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        genres.into_iter().take(n).map(|(g, _)| g.clone()).collect()
    }

    /// Top `n` title types by entry count, stable on ties
    pub fn top_types(&self, n: usize) -> Vec<TitleType> {
        let mut types: Vec<(TitleType, u32)> =
            self.type_counts.iter().map(|(t, c)| (*t, *c)).collect();
        types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        types.into_iter().take(n).map(|(t, _)| t).collect()
    }

    /// Mean of the collected ratings, defaulting when none exist
    pub fn mean_rating(&self) -> f64 {
        if self.ratings.is_empty() {
            DEFAULT_MEAN_RATING
        } else {
            self.ratings.iter().sum::<f64>() / self.ratings.len() as f64
        }
    }

    /// Fraction of entries with status completed
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            top_genres: self.top_genres(3),
            avg_rating: (self.mean_rating() * 10.0).round() / 10.0,
            completion_rate: (self.completion_rate() * 100.0).round() as u32,
        }
    }
}

/// Condensed profile returned alongside recommendations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    pub top_genres: Vec<String>,
    pub avg_rating: f64,
    /// Whole percent
    pub completion_rate: u32,
}

/// The single response shape for the recommendation endpoint
///
/// `user_profile` is absent only on the cold-start path, which skips
/// profiling entirely.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub source: RecommendationSource,
    pub recommendations: Vec<Recommendation>,
    pub user_profile: Option<ProfileSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn title(name: &str, title_type: TitleType, genres: &[&str]) -> Title {
        Title::new(
            name.to_string(),
            title_type,
            genres.iter().map(|g| g.to_string()).collect(),
        )
    }

    fn rated_entry(title_id: Uuid, rating: u8, status: WatchStatus) -> WatchEntry {
        let mut entry = WatchEntry::new(title_id);
        entry.set_rating(rating).unwrap();
        entry.set_status(status, None);
        entry
    }

    #[test]
    fn test_single_completed_entry_profile() {
        let show = title("Show A", TitleType::Tv, &["Action", "Drama"]);
        let entry = rated_entry(show.id, 9, WatchStatus::Completed);

        let mut profile = UserProfile::default();
        profile.observe(&entry, &show);

        assert!((profile.genre_weight("Action") - 0.9).abs() < f64::EPSILON);
        assert!((profile.genre_weight("Drama") - 0.9).abs() < f64::EPSILON);
        assert_eq!(profile.mean_rating(), 9.0);
        assert_eq!(profile.completion_rate(), 1.0);

        let top = profile.top_genres(5);
        assert!(top[0] == "Action" || top[0] == "Drama");
    }

    #[test]
    fn test_unrated_entry_uses_default_weight() {
        let show = title("Show B", TitleType::Movie, &["Romance"]);
        let entry = WatchEntry::new(show.id);

        let mut profile = UserProfile::default();
        profile.observe(&entry, &show);

        assert!((profile.genre_weight("Romance") - 0.5).abs() < f64::EPSILON);
        assert_eq!(profile.mean_rating(), DEFAULT_MEAN_RATING);
    }

    #[test]
    fn test_top_genres_ranked_by_weight() {
        let mut profile = UserProfile::default();
        let a = title("A", TitleType::Tv, &["Action", "Comedy"]);
        let b = title("B", TitleType::Tv, &["Action"]);
        profile.observe(&rated_entry(a.id, 8, WatchStatus::Completed), &a);
        profile.observe(&rated_entry(b.id, 10, WatchStatus::Watching), &b);

        let top = profile.top_genres(2);
        assert_eq!(top, vec!["Action".to_string(), "Comedy".to_string()]);
    }

    #[test]
    fn test_top_types_ranked_by_count() {
        let mut profile = UserProfile::default();
        for name in ["A", "B", "C"] {
            let t = title(name, TitleType::Tv, &[]);
            profile.observe(&WatchEntry::new(t.id), &t);
        }
        let movie = title("M", TitleType::Movie, &[]);
        profile.observe(&WatchEntry::new(movie.id), &movie);

        assert_eq!(profile.top_types(2), vec![TitleType::Tv, TitleType::Movie]);
    }

    #[test]
    fn test_summary_rounding() {
        let mut profile = UserProfile::default();
        let a = title("A", TitleType::Tv, &["Action"]);
        let b = title("B", TitleType::Tv, &["Action"]);
        let c = title("C", TitleType::Tv, &["Action"]);
        profile.observe(&rated_entry(a.id, 7, WatchStatus::Completed), &a);
        profile.observe(&rated_entry(b.id, 8, WatchStatus::Watching), &b);
        profile.observe(&rated_entry(c.id, 8, WatchStatus::Plan), &c);

        let summary = profile.summary();
        // 23 / 3 = 7.666..., one decimal
        assert_eq!(summary.avg_rating, 7.7);
        // 1 of 3 completed
        assert_eq!(summary.completion_rate, 33);
        assert_eq!(summary.top_genres, vec!["Action".to_string()]);
    }

    #[test]
    fn test_empty_profile() {
        let profile = UserProfile::default();
        assert!(profile.is_empty());
        assert_eq!(profile.mean_rating(), DEFAULT_MEAN_RATING);
        assert_eq!(profile.completion_rate(), 0.0);
        assert!(profile.top_genres(5).is_empty());
    }
}
