//! The party scene: owns the level, the physics world and every entity, and turns
//! spawner and collision results into bus events.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use engine::{
    BodyDesc, BodyId, Camera2D, InputSnapshot, PhysicsWorld, Scene, SceneCommand, SteeringHost,
    StepReport, SubscriptionId, TimerQueue, Vec2,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::collision::{self, ContactChange, CATEGORY_GUESTS, CATEGORY_PLAYER, CATEGORY_WALLS};
use crate::config::GameConfig;
use crate::entities::{Guest, GuestBehavior, Issue, IssueTuning, Player, PlayerTuning};
use crate::events::{
    GameBus, GameEvent, GameEventKind, GameSummary, GameUpdate, GuestId, IssueId, IssueMarker,
    SoundCue,
};
use crate::house::HouseMap;
use crate::spawners::{GuestPlacement, GuestSpawner, IssuePlacement, IssueSpawner};

const GAME_OVER_STING_DELAY_SECONDS: f32 = 1.0;
const FALLBACK_VIEWPORT: (u32, u32) = (1280, 720);

include!("types.rs");
include!("scene_state.rs");
include!("scene_impl.rs");

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
