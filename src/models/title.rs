use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broadcast format of a catalog entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TitleType {
    Tv,
    Movie,
    Ova,
    Ona,
    Special,
}

/// A catalog entry users track
///
/// `average_rating` and `total_ratings` are derived fields: the store
/// recomputes them from the full set of per-user ratings whenever a rating
/// is added, changed, or removed. Nothing else writes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Title {
    /// Unique identifier for the title
    pub id: Uuid,
    /// Canonical display name
    pub name: String,
    pub title_type: TitleType,
    pub genres: Vec<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    /// Total episode count; `None` while a series is still airing
    #[serde(default)]
    pub episode_count: Option<u32>,
    /// First air date, when known
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    /// Mean of all per-user ratings, 0-10
    pub average_rating: f64,
    pub total_ratings: u32,
    /// Number of watchlists this title appears on
    pub popularity: u64,
}

impl Title {
    /// Creates a new unrated title
    pub fn new(name: String, title_type: TitleType, genres: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            title_type,
            genres,
            synopsis: None,
            episode_count: None,
            release_date: None,
            average_rating: 0.0,
            total_ratings: 0,
            popularity: 0,
        }
    }

    pub fn with_episodes(mut self, episode_count: u32) -> Self {
        self.episode_count = Some(episode_count);
        self
    }

    pub fn with_release_date(mut self, release_date: DateTime<Utc>) -> Self {
        self.release_date = Some(release_date);
        self
    }

    /// Whether any of this title's genres falls outside the given set
    pub fn has_genre_outside(&self, genres: &[String]) -> bool {
        self.genres.iter().any(|g| !genres.contains(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_title_starts_unrated() {
        let title = Title::new(
            "Cowboy Bebop".to_string(),
            TitleType::Tv,
            vec!["Action".to_string(), "Sci-Fi".to_string()],
        );
        assert_eq!(title.name, "Cowboy Bebop");
        assert_eq!(title.average_rating, 0.0);
        assert_eq!(title.total_ratings, 0);
        assert_eq!(title.popularity, 0);
    }

    #[test]
    fn test_title_type_serialization() {
        let tv = serde_json::to_string(&TitleType::Tv).unwrap();
        let ova = serde_json::to_string(&TitleType::Ova).unwrap();
        assert_eq!(tv, "\"tv\"");
        assert_eq!(ova, "\"ova\"");
    }

    #[test]
    fn test_has_genre_outside() {
        let title = Title::new(
            "Mushishi".to_string(),
            TitleType::Tv,
            vec!["Mystery".to_string(), "Slice of Life".to_string()],
        );
        let top = vec!["Mystery".to_string()];
        assert!(title.has_genre_outside(&top));

        let all = vec!["Mystery".to_string(), "Slice of Life".to_string()];
        assert!(!title.has_genre_outside(&all));
    }
}
