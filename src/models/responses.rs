use serde::{Deserialize, Serialize};
use crate::models::domain::{Decision, IncomingRequest, MatchSummary, RequestStatus, UserId};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Record decision response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub success: bool,
    #[serde(rename = "targetUserId")]
    pub target_user_id: UserId,
    pub decision: Decision,
}

/// Result of sending or answering a match request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchActionResponse {
    pub success: bool,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub status: RequestStatus,
    /// Set once a request is accepted
    #[serde(rename = "matchId", skip_serializing_if = "Option::is_none")]
    pub match_id: Option<i64>,
}

/// Pending requests addressed to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingRequestsResponse {
    pub requests: Vec<IncomingRequest>,
}

/// The caller's matches, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentMatchesResponse {
    pub matches: Vec<MatchSummary>,
}
