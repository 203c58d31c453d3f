//! Loadout point-budget accounting.
//!
//! Each slotted mission contributes challenge-weighted points toward its
//! owner's daily total. The server is the authority on `points_used`; the
//! functions here only produce the optimistic display value shown between
//! a mutation and the follow-up config refetch. Going over budget is a
//! warning signal, never a rejection.

use crate::fields::Challenge;
use crate::mission::{LoadoutConfig, Mission};
use crate::views::loadout_missions;

/// Point weight of a challenge rating. Unset counts as high -- the one
/// explicit default shared with the sort ranking.
pub fn challenge_points(c: Option<Challenge>) -> u32 {
    match c {
        Some(Challenge::Low) => 1,
        Some(Challenge::Medium) => 2,
        Some(Challenge::High) | None => 3,
    }
}

/// Locally-estimated points for `user`'s current loadout.
pub fn local_points(missions: &[Mission], user: &str) -> u32 {
    loadout_missions(missions, user)
        .iter()
        .map(|m| challenge_points(m.challenge))
        .sum()
}

/// True when the budget is exceeded. A soft warning for display only.
pub fn is_overloaded(config: &LoadoutConfig) -> bool {
    config.points_used > config.points_limit
}
