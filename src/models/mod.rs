pub mod recommendation;
pub mod reminder;
pub mod title;
pub mod user;

pub use recommendation::{
    ProfileSummary, Recommendation, RecommendationResponse, RecommendationSource, UserProfile,
};
pub use reminder::{Reminder, ReminderType, WeeklySchedule};
pub use title::{Title, TitleType};
pub use user::{User, WatchEntry, WatchStatus};
