// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ordered_pair, Candidate, CandidatePage, Decision, IncomingRequest, MatchPreferences,
    MatchReason, MatchSummary, Profile, Recommendation, RequestStatus, TraitScores, UserId,
};
pub use requests::{DecisionRequest, MatchRequestBody, MatchRespondBody, RecommendationQuery};
pub use responses::{
    DecisionResponse, ErrorResponse, HealthResponse, IncomingRequestsResponse, MatchActionResponse,
    RecentMatchesResponse,
};
