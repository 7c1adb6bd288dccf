use thiserror::Error;

use crate::models::UserId;

/// Errors surfaced by a recommendation request
///
/// Exclusion and image lookups that fail are recovered inside the pipeline
/// and never show up here (unless the exclusion policy is `fail`).
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Profile not found: {0}")]
    NotFound(UserId),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Recommendation cancelled")]
    Cancelled,
}

impl MatchError {
    /// Whether the caller, not the service, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, MatchError::NotFound(_))
    }
}
