use engine::{BodyDesc, BodyId, PhysicsWorld, Shape, SpringDesc, Vec2};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::collision::{CATEGORY_GUESTS, CATEGORY_PLAYER, CATEGORY_WALLS};
use crate::config::GameConfig;
use crate::events::GuestId;

pub const GUEST_RADIUS: f32 = 32.0;
pub const GUEST_AIR_FRICTION: f32 = 0.1;
pub const TETHER_LENGTH: f32 = 64.0;
pub const TETHER_STIFFNESS: f32 = 2.0;
pub const TETHER_DAMPING: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuestBehavior {
    pub countdown_mean_seconds: f32,
    pub countdown_std_dev_seconds: f32,
    pub countdown_min_seconds: f32,
    pub issue_chance: f64,
}

impl From<&GameConfig> for GuestBehavior {
    fn from(config: &GameConfig) -> Self {
        Self {
            countdown_mean_seconds: config.guest_countdown_mean_seconds,
            countdown_std_dev_seconds: config.guest_countdown_std_dev_seconds,
            countdown_min_seconds: config.guest_countdown_min_seconds,
            issue_chance: config.guest_issue_chance,
        }
    }
}

impl GuestBehavior {
    pub fn draw_countdown(&self, rng: &mut impl Rng) -> f32 {
        let drawn = match Normal::new(self.countdown_mean_seconds, self.countdown_std_dev_seconds) {
            Ok(normal) => normal.sample(rng),
            Err(_) => self.countdown_mean_seconds,
        };
        drawn.max(self.countdown_min_seconds)
    }

    fn rolls_issue(&self, rng: &mut impl Rng) -> bool {
        rng.gen::<f64>() < self.issue_chance
    }
}

#[derive(Debug, Clone)]
pub struct Guest {
    id: GuestId,
    spot: usize,
    position: Vec2,
    body: BodyId,
    behavior: GuestBehavior,
    countdown: f32,
}

impl Guest {
    /// Creates the guest body at `home` and tethers it there with a spring.
    pub fn spawn(
        world: &mut PhysicsWorld,
        id: GuestId,
        spot: usize,
        home: Vec2,
        behavior: GuestBehavior,
        rng: &mut impl Rng,
    ) -> Self {
        let body = world.add_body(
            BodyDesc::dynamic(Shape::circle(GUEST_RADIUS), home)
                .with_category(CATEGORY_GUESTS)
                .with_mask(CATEGORY_WALLS | CATEGORY_PLAYER | CATEGORY_GUESTS)
                .with_air_friction(GUEST_AIR_FRICTION),
        );
        world.add_spring(SpringDesc {
            anchor: home,
            body,
            stiffness: TETHER_STIFFNESS,
            damping: TETHER_DAMPING,
            length: TETHER_LENGTH,
        });
        Self {
            id,
            spot,
            position: home,
            body,
            behavior,
            countdown: behavior.draw_countdown(rng),
        }
    }

    /// Removes the body; its tether goes with it.
    pub fn despawn(&self, world: &mut PhysicsWorld) {
        world.remove_body(self.body);
    }

    pub fn id(&self) -> GuestId {
        self.id
    }

    pub fn spot(&self) -> usize {
        self.spot
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    /// Runs the idle countdown. Returns `true` when the guest wants an issue spawned
    /// next to it.
    pub fn update(&mut self, dt_seconds: f32, rng: &mut impl Rng) -> bool {
        self.countdown -= dt_seconds;
        if self.countdown > 0.0 {
            return false;
        }
        self.countdown = self.behavior.draw_countdown(rng);
        self.behavior.rolls_issue(rng)
    }

    pub fn sync_position(&mut self, world: &PhysicsWorld) {
        if let Some(position) = world.position(self.body) {
            self.position = position;
        }
    }
}
