//! Affinity Match - recommendation engine for the Affinity dating app
//!
//! Given a viewer, this library fetches one page of candidate profiles,
//! drops everyone the viewer already liked or rejected, scores the rest
//! concurrently and returns them best match first.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    calculate_match_score, normalize_score, CancelHandle, CancelSignal, MatchError, Matcher,
    Ranker,
};
pub use models::{Candidate, MatchPreferences, Profile, Recommendation, RecommendationQuery, UserId};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TraitScores;

    #[test]
    fn test_library_exports() {
        let profile = Profile {
            id: 1,
            name: "Asha".to_string(),
            gender: "F".to_string(),
            age: 27,
            city: "Mumbai".to_string(),
            latitude: None,
            longitude: None,
            total_score: 80,
            traits: TraitScores::uniform(80),
        };

        let (score, _) = calculate_match_score(&profile, &profile, crate::core::GEO_DISABLED);
        assert_eq!(normalize_score(score), 100);
    }
}
