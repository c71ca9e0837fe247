//! Application state shared across all request handlers.

use std::sync::Arc;

use crate::coach::core::config::CoachConfig;
use crate::coach::core::errors::CoachResult;
use crate::coach::orchestrator::DietCoach;

/// Shared application state.
pub struct AppState {
    /// The diet coach and its collaborators.
    pub coach: DietCoach,
}

impl AppState {
    /// Wrap an assembled coach.
    #[must_use]
    pub fn new(coach: DietCoach) -> Arc<Self> {
        Arc::new(Self { coach })
    }

    /// Build the coach with production collaborators.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or a backend cannot start.
    pub async fn from_config(config: CoachConfig) -> CoachResult<Arc<Self>> {
        let coach = DietCoach::from_config(config).await?;
        Ok(Self::new(coach))
    }
}
