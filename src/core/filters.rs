use std::collections::HashSet;

use crate::models::{Profile, UserId};

/// Drop the viewer and every already-decided candidate from a raw page
///
/// Order of the remaining candidates is preserved.
pub fn exclude_decided(
    candidates: Vec<Profile>,
    exclusions: &HashSet<UserId>,
    viewer_id: UserId,
) -> Vec<Profile> {
    candidates
        .into_iter()
        .filter(|profile| is_eligible(profile.id, exclusions, viewer_id))
        .collect()
}

#[inline]
fn is_eligible(id: UserId, exclusions: &HashSet<UserId>, viewer_id: UserId) -> bool {
    id != viewer_id && !exclusions.contains(&id)
}
