use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::config::MatchingSettings;
use crate::models::domain::{Decision, MatchPreferences, UserId};

/// Query string of the recommendations endpoint
///
/// Every field is optional; out-of-range values fall back to configured
/// defaults instead of being rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationQuery {
    pub gender: Option<String>,
    pub age_min: Option<i64>,
    pub age_max: Option<i64>,
    pub limit: Option<i64>,
    pub min_score: Option<i64>,
    pub cursor: Option<i64>,
}

impl RecommendationQuery {
    pub fn into_preferences(self, settings: &MatchingSettings) -> MatchPreferences {
        let target_gender = self
            .gender
            .as_deref()
            .and_then(|g| g.trim().chars().next())
            .map(|c| c.to_ascii_uppercase());

        let limit = match self.limit {
            Some(l) if l >= 1 && l <= settings.max_limit as i64 => l as usize,
            _ => settings.default_limit,
        };

        let min_score = match self.min_score {
            Some(s) if (0..=100).contains(&s) => s as u8,
            _ => settings.default_min_score,
        };

        MatchPreferences {
            target_gender,
            age_min: age_bound(self.age_min),
            age_max: age_bound(self.age_max),
            min_score,
            cursor: self.cursor.filter(|c| *c > 0).unwrap_or(0),
            limit,
        }
    }
}

/// `0`, negative and absurd ages all mean "no bound"
fn age_bound(value: Option<i64>) -> Option<u8> {
    value
        .filter(|v| *v > 0)
        .and_then(|v| u8::try_from(v).ok())
}

/// Request to record a like or reject
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DecisionRequest {
    #[validate(range(min = 1))]
    #[serde(alias = "target_user_id", rename = "targetUserId")]
    pub target_user_id: UserId,
    pub decision: Decision,
}

/// Request to send a match request to another user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRequestBody {
    #[validate(range(min = 1))]
    #[serde(alias = "receiver_id", rename = "receiverId")]
    pub receiver_id: UserId,
}

/// Receiver's answer to a pending match request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchRespondBody {
    #[validate(range(min = 1))]
    #[serde(alias = "sender_id", rename = "senderId")]
    pub sender_id: UserId,
    pub accept: bool,
}
