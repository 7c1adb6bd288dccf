//! Storage collaborators consumed by the recommendation pipeline.
//!
//! The pipeline only ever reads through these traits, so the Postgres-backed
//! implementations in `services` and in-memory fakes in tests are
//! interchangeable.

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{CandidatePage, MatchPreferences, Profile, UserId};

/// Errors reported by a storage collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Profile reads: the viewer and pages of raw candidates
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a single profile, `StoreError::NotFound` if it does not exist
    async fn get_profile(&self, id: UserId) -> Result<Profile, StoreError>;

    /// Fetch up to `limit + 1` candidates matching the preference filters
    /// with `id > cursor`, ordered by ascending id.
    async fn fetch_candidate_page(
        &self,
        prefs: &MatchPreferences,
    ) -> Result<CandidatePage, StoreError>;
}

/// Ids a viewer has already liked or rejected
#[async_trait]
pub trait ExclusionStore: Send + Sync {
    /// An empty set is a valid result
    async fn fetch_exclusions(&self, viewer: UserId) -> Result<HashSet<UserId>, StoreError>;
}

/// Per-candidate enrichment with profile pictures
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Ordered image URLs, primary image first; no images is not an error
    async fn fetch_image_urls(&self, id: UserId) -> Result<Vec<String>, StoreError>;
}
