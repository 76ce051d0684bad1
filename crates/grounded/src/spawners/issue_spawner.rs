use engine::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::GameConfig;
use crate::entities::Guest;
use crate::events::GuestId;
use crate::house::HouseMap;

/// A new issue the scene should create.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IssuePlacement {
    pub guest: GuestId,
    pub position: Vec2,
    pub hard: bool,
    /// `true` when the minimum interval forced the spawn, `false` for guest requests.
    pub forced: bool,
}

#[derive(Debug, Clone)]
pub struct IssueSpawner {
    min_interval_seconds: f32,
    elapsed_seconds: f32,
    hard_base_chance: f64,
    margin: f32,
    placement_tries: u32,
    disabled: bool,
}

impl IssueSpawner {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            min_interval_seconds: config.issue_min_interval_seconds,
            elapsed_seconds: 0.0,
            hard_base_chance: config.hard_issue_base_chance,
            margin: config.issue_margin,
            placement_tries: config.issue_placement_tries,
            disabled: config.issues_disabled,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed_seconds
    }

    /// Probability that a spawn is hard: the base chance scaled by the guest count.
    pub fn hard_chance(&self, guest_count: usize) -> f64 {
        (self.hard_base_chance * guest_count as f64).clamp(0.0, 1.0)
    }

    /// Forces a spawn next to a random guest once no spawn happened for longer than the
    /// minimum interval. Nothing accumulates while disabled.
    pub fn update(
        &mut self,
        dt_seconds: f32,
        guests: &[Guest],
        map: &HouseMap,
        rng: &mut impl Rng,
    ) -> Option<IssuePlacement> {
        if self.disabled {
            return None;
        }
        self.elapsed_seconds += dt_seconds;
        if self.elapsed_seconds <= self.min_interval_seconds {
            return None;
        }
        self.elapsed_seconds = 0.0;
        let guest = guests.choose(rng)?;
        Some(self.place_near(guest, guests.len(), true, map, rng))
    }

    /// Spawn asked for by `guest`. Restarts the forced-spawn interval.
    pub fn request(
        &mut self,
        guest: &Guest,
        guest_count: usize,
        map: &HouseMap,
        rng: &mut impl Rng,
    ) -> Option<IssuePlacement> {
        if self.disabled {
            return None;
        }
        self.elapsed_seconds = 0.0;
        Some(self.place_near(guest, guest_count, false, map, rng))
    }

    fn place_near(
        &self,
        guest: &Guest,
        guest_count: usize,
        forced: bool,
        map: &HouseMap,
        rng: &mut impl Rng,
    ) -> IssuePlacement {
        let position = map.pick_point_near(guest.position(), rng, self.margin, self.placement_tries);
        let hard = rng.gen_bool(self.hard_chance(guest_count));
        IssuePlacement {
            guest: guest.id(),
            position,
            hard,
            forced,
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::PhysicsWorld;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::entities::GuestBehavior;
    use crate::house::{Room, RoomType};

    fn map() -> HouseMap {
        HouseMap::new(
            Vec::new(),
            vec![Room::new(RoomType::Kitchen, "kitchen", Vec2::new(200.0, 200.0), (400.0, 400.0))],
            Vec::new(),
        )
    }

    fn guests(world: &mut PhysicsWorld, count: u32, rng: &mut ChaCha8Rng) -> Vec<Guest> {
        let behavior = GuestBehavior::from(&GameConfig::default());
        (0..count)
            .map(|id| Guest::spawn(world, GuestId(id), 0, Vec2::new(200.0, 200.0), behavior, rng))
            .collect()
    }

    #[test]
    fn forced_spawn_after_interval_then_resets() {
        let mut world = PhysicsWorld::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let guests = guests(&mut world, 3, &mut rng);
        let mut spawner = IssueSpawner::new(&GameConfig::default());
        let map = map();

        assert!(spawner.update(5.0, &guests, &map, &mut rng).is_none());
        let placement = spawner
            .update(0.1, &guests, &map, &mut rng)
            .expect("forced spawn");
        assert!(placement.forced);
        assert!(map.rooms()[0].contains(placement.position));
        assert_eq!(spawner.elapsed_seconds(), 0.0);
    }

    #[test]
    fn guest_request_restarts_interval() {
        let mut world = PhysicsWorld::new();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let guests = guests(&mut world, 2, &mut rng);
        let mut spawner = IssueSpawner::new(&GameConfig::default());
        let map = map();

        spawner.update(4.0, &guests, &map, &mut rng);
        let placement = spawner
            .request(&guests[1], guests.len(), &map, &mut rng)
            .expect("organic spawn");
        assert_eq!(placement.guest, GuestId(1));
        assert!(!placement.forced);
        assert!(spawner.update(4.0, &guests, &map, &mut rng).is_none());
    }

    #[test]
    fn no_guests_means_no_forced_spawn() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut spawner = IssueSpawner::new(&GameConfig::default());
        assert!(spawner.update(60.0, &[], &map(), &mut rng).is_none());
        assert_eq!(spawner.elapsed_seconds(), 0.0);
    }

    #[test]
    fn disabled_spawner_is_silent_and_keeps_its_timer() {
        let mut world = PhysicsWorld::new();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let guests = guests(&mut world, 2, &mut rng);
        let mut spawner = IssueSpawner::new(&GameConfig::default());
        let map = map();

        spawner.update(3.0, &guests, &map, &mut rng);
        spawner.set_disabled(true);
        assert!(spawner.update(60.0, &guests, &map, &mut rng).is_none());
        assert!(spawner.request(&guests[0], 2, &map, &mut rng).is_none());
        assert_eq!(spawner.elapsed_seconds(), 3.0);
    }

    #[test]
    fn hard_chance_scales_with_guests() {
        let spawner = IssueSpawner::new(&GameConfig {
            hard_issue_base_chance: 0.05,
            ..GameConfig::default()
        });
        assert_eq!(spawner.hard_chance(0), 0.0);
        assert!((spawner.hard_chance(10) - 0.5).abs() < 1e-9);
        assert_eq!(spawner.hard_chance(100), 1.0);

        let mut world = PhysicsWorld::new();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let guests = guests(&mut world, 20, &mut rng);
        let mut spawner = spawner;
        for _ in 0..20 {
            let placement = spawner
                .request(&guests[0], guests.len(), &map(), &mut rng)
                .expect("spawn");
            assert!(placement.hard);
        }
    }
}
