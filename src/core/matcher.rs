use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ExclusionFailurePolicy, MatchingSettings};
use crate::core::{
    cancel::CancelSignal,
    error::MatchError,
    filters::exclude_decided,
    ports::{ExclusionStore, ImageStore, ProfileStore, StoreError},
    ranker::Ranker,
};
use crate::models::{MatchPreferences, Recommendation, UserId};

/// Recommendation orchestrator
///
/// # Pipeline Stages
/// 1. Viewer lookup (fails fast if the viewer does not exist)
/// 2. Exclusion lookup (liked/rejected ids, degraded to empty on failure by default)
/// 3. One page of raw candidates from the profile store
/// 4. Exclusion filtering
/// 5. Concurrent scoring, sorting and truncation
///
/// The matcher keeps no state between requests.
#[derive(Clone)]
pub struct Matcher {
    profiles: Arc<dyn ProfileStore>,
    exclusions: Arc<dyn ExclusionStore>,
    ranker: Ranker,
    exclusion_policy: ExclusionFailurePolicy,
    request_timeout: Option<Duration>,
}

impl Matcher {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        exclusions: Arc<dyn ExclusionStore>,
        images: Arc<dyn ImageStore>,
        settings: &MatchingSettings,
    ) -> Self {
        Self {
            profiles,
            exclusions,
            ranker: Ranker::new(images, settings.concurrency),
            exclusion_policy: settings.exclusion_failure,
            request_timeout: settings.request_timeout(),
        }
    }

    /// Compute the top candidates for `viewer_id`.
    ///
    /// Resolves to `MatchError::Cancelled` if `cancel` fires or the configured
    /// request timeout elapses first; in-flight scoring tasks are abandoned and
    /// nothing partial is returned.
    #[tracing::instrument(
        name = "recommend",
        skip(self, prefs, cancel),
        fields(limit = prefs.limit, cursor = prefs.cursor)
    )]
    pub async fn recommend(
        &self,
        viewer_id: UserId,
        prefs: &MatchPreferences,
        cancel: &CancelSignal,
    ) -> Result<Recommendation, MatchError> {
        let pipeline = self.run_pipeline(viewer_id, prefs);

        let bounded = async {
            match self.request_timeout {
                Some(limit) => match tokio::time::timeout(limit, pipeline).await {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!("Recommendation for {} timed out after {:?}", viewer_id, limit);
                        Err(MatchError::Cancelled)
                    }
                },
                None => pipeline.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Recommendation for {} cancelled by caller", viewer_id);
                Err(MatchError::Cancelled)
            }
            result = bounded => result,
        }
    }

    async fn run_pipeline(
        &self,
        viewer_id: UserId,
        prefs: &MatchPreferences,
    ) -> Result<Recommendation, MatchError> {
        let viewer = self
            .profiles
            .get_profile(viewer_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => MatchError::NotFound(viewer_id),
                other => {
                    tracing::error!("Failed to fetch viewer profile {}: {}", viewer_id, other);
                    MatchError::Infrastructure(format!("viewer lookup failed: {}", other))
                }
            })?;

        let exclusions = self.load_exclusions(viewer_id).await?;

        let page = self
            .profiles
            .fetch_candidate_page(prefs)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch candidates for {}: {}", viewer_id, e);
                MatchError::Infrastructure(format!("candidate lookup failed: {}", e))
            })?;

        let fetched = page.profiles.len();
        let eligible = exclude_decided(page.profiles, &exclusions, viewer_id);

        tracing::debug!(
            "Scoring {} of {} fetched candidates for {} ({} exclusions)",
            eligible.len(),
            fetched,
            viewer_id,
            exclusions.len()
        );

        let candidates = self
            .ranker
            .rank(Arc::new(viewer), eligible, prefs.limit)
            .await?;

        tracing::info!(
            "Returning {} candidates for {} (next cursor: {:?})",
            candidates.len(),
            viewer_id,
            page.next_cursor
        );

        Ok(Recommendation {
            candidates,
            next_cursor: page.next_cursor,
        })
    }

    async fn load_exclusions(&self, viewer_id: UserId) -> Result<HashSet<UserId>, MatchError> {
        match self.exclusions.fetch_exclusions(viewer_id).await {
            Ok(ids) => Ok(ids),
            Err(e) => match self.exclusion_policy {
                ExclusionFailurePolicy::Degrade => {
                    tracing::warn!(
                        "Failed to fetch exclusions for {}, proceeding without filtering: {}",
                        viewer_id,
                        e
                    );
                    Ok(HashSet::new())
                }
                ExclusionFailurePolicy::Fail => {
                    tracing::error!("Failed to fetch exclusions for {}: {}", viewer_id, e);
                    Err(MatchError::Infrastructure(format!("exclusion lookup failed: {}", e)))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidatePage, Profile, TraitScores};
    use async_trait::async_trait;

    fn create_candidate(id: UserId, total: u8) -> Profile {
        Profile {
            id,
            name: format!("User {}", id),
            gender: "F".to_string(),
            age: 24,
            city: "Chennai".to_string(),
            latitude: None,
            longitude: None,
            total_score: total,
            traits: TraitScores::uniform(total),
        }
    }

    /// Viewer 1 plus candidates 2..=5, exclusion lookups configurable
    struct FakeStore {
        users: Vec<Profile>,
        exclusions: Option<HashSet<UserId>>,
        candidates_fail: bool,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                users: (1..=5).map(|id| create_candidate(id, 60 + id as u8)).collect(),
                exclusions: Some(HashSet::new()),
                candidates_fail: false,
            }
        }
    }

    #[async_trait]
    impl ProfileStore for FakeStore {
        async fn get_profile(&self, id: UserId) -> Result<Profile, StoreError> {
            self.users
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
        }

        async fn fetch_candidate_page(
            &self,
            prefs: &MatchPreferences,
        ) -> Result<CandidatePage, StoreError> {
            if self.candidates_fail {
                return Err(StoreError::Backend("connection reset".to_string()));
            }
            let rows = self
                .users
                .iter()
                .filter(|p| p.id > prefs.cursor)
                .take(prefs.limit + 1)
                .cloned()
                .collect();
            Ok(CandidatePage::from_rows(rows, prefs.limit))
        }
    }

    #[async_trait]
    impl ExclusionStore for FakeStore {
        async fn fetch_exclusions(&self, _viewer: UserId) -> Result<HashSet<UserId>, StoreError> {
            self.exclusions
                .clone()
                .ok_or_else(|| StoreError::Backend("exclusions table unavailable".to_string()))
        }
    }

    #[async_trait]
    impl ImageStore for FakeStore {
        async fn fetch_image_urls(&self, _id: UserId) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn matcher_with(store: FakeStore, settings: &MatchingSettings) -> Matcher {
        let store = Arc::new(store);
        Matcher::new(store.clone(), store.clone(), store, settings)
    }

    fn prefs(limit: usize) -> MatchPreferences {
        MatchPreferences {
            target_gender: None,
            age_min: None,
            age_max: None,
            min_score: 0,
            cursor: 0,
            limit,
        }
    }

    #[tokio::test]
    async fn test_recommend_basic() {
        let matcher = matcher_with(FakeStore::new(), &MatchingSettings::default());

        let rec = matcher
            .recommend(1, &prefs(10), &CancelSignal::never())
            .await
            .unwrap();

        let ids: Vec<UserId> = rec.candidates.iter().map(|c| c.user.id).collect();
        // Viewer (61) is closest to 62, then 63...
        assert_eq!(ids, vec![2, 3, 4, 5]);
        assert_eq!(rec.next_cursor, None);
    }

    #[tokio::test]
    async fn test_missing_viewer_is_not_found() {
        let matcher = matcher_with(FakeStore::new(), &MatchingSettings::default());

        let err = matcher
            .recommend(42, &prefs(10), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, MatchError::NotFound(42)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_exclusion_outage_fails_under_strict_policy() {
        let mut store = FakeStore::new();
        store.exclusions = None;
        let settings = MatchingSettings {
            exclusion_failure: ExclusionFailurePolicy::Fail,
            ..MatchingSettings::default()
        };
        let matcher = matcher_with(store, &settings);

        let err = matcher
            .recommend(1, &prefs(10), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, MatchError::Infrastructure(_)));
    }

    #[tokio::test]
    async fn test_candidate_outage_is_infrastructure_error() {
        let mut store = FakeStore::new();
        store.candidates_fail = true;
        let matcher = matcher_with(store, &MatchingSettings::default());

        let err = matcher
            .recommend(1, &prefs(10), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, MatchError::Infrastructure(_)));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let matcher = matcher_with(FakeStore::new(), &MatchingSettings::default());
        let (handle, signal) = CancelSignal::pair();
        handle.cancel();

        let err = matcher.recommend(1, &prefs(10), &signal).await.unwrap_err();

        assert!(matches!(err, MatchError::Cancelled));
    }
}
