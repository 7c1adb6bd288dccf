use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable user identifier, also used as the pagination cursor
pub type UserId = i64;

/// The four questionnaire-derived trait scores, each in 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitScores {
    pub personality: u8,
    pub communication: u8,
    pub emotional: u8,
    pub confidence: u8,
}

impl TraitScores {
    pub fn uniform(value: u8) -> Self {
        Self {
            personality: value,
            communication: value,
            emotional: value,
            confidence: value,
        }
    }
}

/// Immutable snapshot of a user profile read from storage
///
/// Trait and total scores are validated upstream when they are submitted,
/// so everything here is assumed to already lie in 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub gender: String,
    pub age: u8,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(rename = "totalScore")]
    pub total_score: u8,
    #[serde(flatten)]
    pub traits: TraitScores,
}

/// Filters and paging parameters for one recommendation request
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPreferences {
    pub target_gender: Option<char>,
    pub age_min: Option<u8>,
    pub age_max: Option<u8>,
    pub min_score: u8,
    /// Last id seen on the previous page, `0` for the first page
    pub cursor: UserId,
    /// Already clamped to the configured maximum
    pub limit: usize,
}

/// Why a candidate scored the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    TotalScoreProximity,
    TraitsMatch,
}

impl MatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::TotalScoreProximity => "total_score_proximity",
            MatchReason::TraitsMatch => "traits_match",
        }
    }
}

/// A profile scored relative to one viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub user: Profile,
    /// Raw compatibility in [0, 75]
    pub score: f64,
    pub reasons: Vec<MatchReason>,
    /// Raw score rescaled to [0, 100] for display
    #[serde(rename = "matchScore")]
    pub match_score: u8,
    /// Image URLs, primary first
    #[serde(default)]
    pub images: Vec<String>,
}

/// One page of raw candidates as returned by the profile store
#[derive(Debug, Clone, Default)]
pub struct CandidatePage {
    /// Up to `limit + 1` profiles ordered by ascending id
    pub profiles: Vec<Profile>,
    pub next_cursor: Option<UserId>,
}

impl CandidatePage {
    /// Build a page from rows fetched with `LIMIT limit + 1`.
    ///
    /// When the extra row is present its id becomes the next cursor. The row
    /// itself is kept so that it is scored along with the rest of the page.
    pub fn from_rows(profiles: Vec<Profile>, limit: usize) -> Self {
        let next_cursor = profiles.get(limit).map(|p| p.id);
        Self {
            profiles,
            next_cursor,
        }
    }
}

/// Final ranked, paginated result
///
/// `candidates` may be shorter than the requested limit even when
/// `next_cursor` is set: exclusions are applied after the page is fetched and
/// no further pages are pulled to make up the difference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub candidates: Vec<Candidate>,
    #[serde(rename = "nextCursor")]
    pub next_cursor: Option<UserId>,
}

/// Outcome a viewer recorded for another profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Liked,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Liked => "liked",
            Decision::Rejected => "rejected",
        }
    }
}

/// Lifecycle of a match request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Status a pending request moves to once its receiver answers
    pub fn from_response(accept: bool) -> Self {
        if accept {
            RequestStatus::Accepted
        } else {
            RequestStatus::Rejected
        }
    }
}

/// A pending match request, as shown to its receiver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingRequest {
    pub id: i64,
    #[serde(rename = "senderId")]
    pub sender_id: UserId,
    pub name: String,
    pub age: u8,
    pub city: String,
    /// Primary image, or the most recent upload
    pub image: Option<String>,
    #[serde(rename = "totalScore")]
    pub total_score: u8,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A mutual match, as seen by one of its two users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(rename = "matchId")]
    pub match_id: i64,
    /// The other user in the match
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub name: String,
    pub age: u8,
    pub city: String,
    pub image: Option<String>,
    #[serde(rename = "totalScore")]
    pub total_score: u8,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
}

/// Matches are stored once per pair, smaller id first
#[inline]
pub fn ordered_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
