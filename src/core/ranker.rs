use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::core::error::MatchError;
use crate::core::ports::ImageStore;
use crate::core::scoring::{calculate_match_score, normalize_score, GEO_DISABLED};
use crate::models::{Candidate, Profile};

/// Scores candidates concurrently and returns the best `limit` of them
///
/// Every candidate gets its own task. At most `concurrency` tasks are past
/// the semaphore at any time, which bounds the load on the image store.
/// Finished candidates are sent to a single collector over a channel, so no
/// task ever touches the result list directly.
#[derive(Clone)]
pub struct Ranker {
    images: Arc<dyn ImageStore>,
    concurrency: usize,
}

impl Ranker {
    pub fn new(images: Arc<dyn ImageStore>, concurrency: usize) -> Self {
        Self {
            images,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Score, enrich, sort and truncate.
    ///
    /// Either every candidate is scored or an error is returned; a partial
    /// ranking is never produced. Dropping the returned future aborts all
    /// in-flight tasks.
    pub async fn rank(
        &self,
        viewer: Arc<Profile>,
        candidates: Vec<Profile>,
        limit: usize,
    ) -> Result<Vec<Candidate>, MatchError> {
        let expected = candidates.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<Candidate>(expected);
        let mut tasks = JoinSet::new();
        // Declared after the JoinSet so it drops first: once the ranking is
        // abandoned, tasks still queued on the semaphore cannot start.
        let _close = CloseOnDrop(Arc::clone(&semaphore));

        for profile in candidates {
            let viewer = Arc::clone(&viewer);
            let images = Arc::clone(&self.images);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let candidate = score_candidate(&viewer, profile, images.as_ref()).await;
                // The collector outlives every task, so a send only fails
                // once the whole ranking has been abandoned.
                let _ = tx.send(candidate).await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(expected);
        while let Some(candidate) = rx.recv().await {
            results.push(candidate);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Scoring task failed: {}", e);
                return Err(MatchError::Infrastructure(format!("scoring task failed: {}", e)));
            }
        }

        if results.len() != expected {
            return Err(MatchError::Infrastructure(format!(
                "scored {} of {} candidates",
                results.len(),
                expected
            )));
        }

        sort_and_truncate(&mut results, limit);
        Ok(results)
    }
}

struct CloseOnDrop(Arc<Semaphore>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Score one candidate and attach its images
///
/// A failing image lookup is logged and leaves the candidate without images.
async fn score_candidate(viewer: &Profile, profile: Profile, images: &dyn ImageStore) -> Candidate {
    let (score, reasons) = calculate_match_score(viewer, &profile, GEO_DISABLED);

    let images = match images.fetch_image_urls(profile.id).await {
        Ok(urls) => urls,
        Err(e) => {
            tracing::warn!(
                "Image lookup failed for {}, continuing without images: {}",
                profile.id,
                e
            );
            Vec::new()
        }
    };

    Candidate {
        user: profile,
        score,
        reasons,
        match_score: normalize_score(score),
        images,
    }
}

/// Sort by score (descending), then by id (ascending), and keep `limit`
pub fn sort_and_truncate(results: &mut Vec<Candidate>, limit: usize) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.user.id.cmp(&b.user.id))
    });
    results.truncate(limit);
}
