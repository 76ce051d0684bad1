//! Player, guests and issues: the mobile entities the party scene ticks.

mod guest;
mod issue;
mod player;

pub use guest::{
    Guest, GuestBehavior, GUEST_AIR_FRICTION, GUEST_RADIUS, TETHER_DAMPING, TETHER_LENGTH,
    TETHER_STIFFNESS,
};
pub use issue::{Issue, IssueState, IssueTuning, HARD_ISSUE_TIME_FACTOR, ISSUE_CLEAN_RADIUS};
pub use player::{Player, PlayerTuning, PLAYER_AIR_FRICTION, PLAYER_RADIUS};
