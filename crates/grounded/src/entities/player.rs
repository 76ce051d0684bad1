use std::collections::BTreeSet;

use engine::{BodyDesc, BodyId, PhysicsWorld, Shape, Vec2};

use crate::collision::{CATEGORY_GUESTS, CATEGORY_ISSUES, CATEGORY_PLAYER, CATEGORY_WALLS};
use crate::config::GameConfig;
use crate::events::IssueId;

use super::issue::Issue;

pub const PLAYER_RADIUS: f32 = 32.0;
pub const PLAYER_AIR_FRICTION: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerTuning {
    pub max_speed: f32,
    pub move_force: f32,
    pub stamina: f32,
}

impl From<&GameConfig> for PlayerTuning {
    fn from(config: &GameConfig) -> Self {
        Self {
            max_speed: config.player_max_speed,
            move_force: config.player_move_force,
            stamina: config.player_stamina,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    body: BodyId,
    position: Vec2,
    tuning: PlayerTuning,
    active_issues: BTreeSet<IssueId>,
}

impl Player {
    pub fn spawn(world: &mut PhysicsWorld, position: Vec2, tuning: PlayerTuning) -> Self {
        let body = world.add_body(
            BodyDesc::dynamic(Shape::circle(PLAYER_RADIUS), position)
                .with_category(CATEGORY_PLAYER)
                .with_mask(CATEGORY_WALLS | CATEGORY_GUESTS | CATEGORY_ISSUES)
                .with_air_friction(PLAYER_AIR_FRICTION),
        );
        Self {
            body,
            position,
            tuning,
            active_issues: BTreeSet::new(),
        }
    }

    pub fn despawn(&self, world: &mut PhysicsWorld) {
        world.remove_body(self.body);
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn tuning(&self) -> PlayerTuning {
        self.tuning
    }

    pub fn set_stamina(&mut self, stamina: f32) {
        self.tuning.stamina = stamina.max(0.0);
    }

    pub fn active_issues(&self) -> &BTreeSet<IssueId> {
        &self.active_issues
    }

    /// Caps the current speed, then pushes the body along `direction` (if any).
    pub fn move_step(&mut self, world: &mut PhysicsWorld, direction: Option<Vec2>) {
        if let Some(velocity) = world.velocity(self.body) {
            if velocity.length() > self.tuning.max_speed {
                world.set_velocity(
                    self.body,
                    velocity.normalized_or_zero() * self.tuning.max_speed,
                );
            }
        }

        if let Some(direction) = direction {
            let strength = self.tuning.move_force * self.tuning.stamina;
            world.apply_force(self.body, direction.normalized_or_zero() * strength);
        }
    }

    pub fn sync_position(&mut self, world: &PhysicsWorld) {
        if let Some(position) = world.position(self.body) {
            self.position = position;
        }
    }

    pub fn issue_entered(&mut self, issue: &mut Issue) {
        self.active_issues.insert(issue.id());
        issue.start_resolving();
    }

    pub fn issue_exited(&mut self, issue: &mut Issue) {
        self.active_issues.remove(&issue.id());
        issue.stop_resolving();
    }

    /// Drops a resolved issue even if the player is still standing on it.
    pub fn issue_resolved(&mut self, id: IssueId) {
        self.active_issues.remove(&id);
    }
}
