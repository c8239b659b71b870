pub mod ai;
pub mod notifier;
pub mod recommendations;
pub mod scheduler;

pub use ai::{HttpSuggestionProvider, SuggestionProvider};
pub use notifier::{LogNotifier, Notifier};
pub use recommendations::RecommendationEngine;
pub use scheduler::ReminderScheduler;
