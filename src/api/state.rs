use std::sync::Arc;

use crate::services::RecommendationEngine;
use crate::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub engine: Arc<RecommendationEngine>,
}

impl AppState {
    pub fn new(store: Store, engine: Arc<RecommendationEngine>) -> Self {
        Self { store, engine }
    }
}
