//! Decide where guests arrive and when and where issues appear. Spawners only return
//! placements; the scene creates the entities and raises the matching events.

mod guest_spawner;
mod issue_spawner;

pub use guest_spawner::{GuestPlacement, GuestSpawner};
pub use issue_spawner::{IssuePlacement, IssueSpawner};
