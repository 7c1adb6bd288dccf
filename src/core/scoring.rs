use crate::models::{MatchReason, Profile, TraitScores};

/// Weight of the total-score proximity component
pub const TOTAL_SCORE_WEIGHT: f64 = 35.0;

/// Weight of the blended trait similarity component
pub const TRAITS_WEIGHT: f64 = 40.0;

/// Highest raw score a candidate can reach
pub const MAX_RAW_SCORE: f64 = TOTAL_SCORE_WEIGHT + TRAITS_WEIGHT;

const PERSONALITY_WEIGHT: f64 = 0.3;
const COMMUNICATION_WEIGHT: f64 = 0.3;
const EMOTIONAL_WEIGHT: f64 = 0.2;
const CONFIDENCE_WEIGHT: f64 = 0.2;

/// Distance radius passed while geo scoring is switched off
pub const GEO_DISABLED: f64 = 0.0;

/// Calculate a raw compatibility score (0-75) between a viewer and a candidate
///
/// Scoring formula:
/// score = (
///     35 * proximity(total)                  # Similar overall scores
///   + 40 * (0.3 * sim(personality)
///         + 0.3 * sim(communication)
///         + 0.2 * sim(emotional)
///         + 0.2 * sim(confidence))           # Similar individual traits
/// )
/// where sim(a, b) = 1 - |a - b| / 100.
///
/// `max_distance_km` is reserved for a geo-distance component. It currently
/// carries zero weight and is ignored.
pub fn calculate_match_score(
    viewer: &Profile,
    candidate: &Profile,
    max_distance_km: f64,
) -> (f64, Vec<MatchReason>) {
    let _ = max_distance_km;

    let total_component = TOTAL_SCORE_WEIGHT * similarity(viewer.total_score, candidate.total_score);
    let traits_component = TRAITS_WEIGHT * trait_similarity(&viewer.traits, &candidate.traits);

    let score = (total_component + traits_component).clamp(0.0, MAX_RAW_SCORE);

    (
        score,
        vec![MatchReason::TotalScoreProximity, MatchReason::TraitsMatch],
    )
}

/// Rescale a raw score to a 0-100 match percentage
#[inline]
pub fn normalize_score(raw_score: f64) -> u8 {
    (raw_score * 100.0 / MAX_RAW_SCORE).round().clamp(0.0, 100.0) as u8
}

/// Weighted blend of the four per-trait similarities (0-1)
#[inline]
fn trait_similarity(a: &TraitScores, b: &TraitScores) -> f64 {
    PERSONALITY_WEIGHT * similarity(a.personality, b.personality)
        + COMMUNICATION_WEIGHT * similarity(a.communication, b.communication)
        + EMOTIONAL_WEIGHT * similarity(a.emotional, b.emotional)
        + CONFIDENCE_WEIGHT * similarity(a.confidence, b.confidence)
}

/// 1 for identical values, 0 for opposite ends of the 0-100 scale
#[inline]
fn similarity(a: u8, b: u8) -> f64 {
    1.0 - (a as f64 - b as f64).abs() / 100.0
}
