use engine::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::house::SpawnPoint;

/// Where a new guest goes: the spot's index in the map's guest spot list and its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuestPlacement {
    pub spot: usize,
    pub position: Vec2,
}

#[derive(Debug, Clone)]
struct SpotSlot {
    spot: usize,
    position: Vec2,
    order: i32,
    limit: u32,
    occupants: u32,
}

impl SpotSlot {
    fn placement(&self) -> GuestPlacement {
        GuestPlacement {
            spot: self.spot,
            position: self.position,
        }
    }

    fn has_room(&self) -> bool {
        self.occupants < self.limit
    }

    fn is_lonely(&self) -> bool {
        self.occupants == 1 && self.limit > 1
    }
}

/// Decides where guests arrive. Tracks occupancy per spot and the resolved-issue
/// milestone at which the next reactive guest shows up.
#[derive(Debug, Clone)]
pub struct GuestSpawner {
    slots: Vec<SpotSlot>,
    next_milestone: u32,
    milestone_step: [u32; 2],
}

impl GuestSpawner {
    pub fn new(spots: &[SpawnPoint], first_milestone: u32, milestone_step: [u32; 2]) -> Self {
        let mut slots: Vec<SpotSlot> = spots
            .iter()
            .enumerate()
            .map(|(spot, point)| SpotSlot {
                spot,
                position: point.position,
                order: point.order,
                limit: point.limit,
                occupants: 0,
            })
            .collect();
        slots.sort_by_key(|slot| slot.order);
        Self {
            slots,
            next_milestone: first_milestone,
            milestone_step,
        }
    }

    pub fn spot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn next_milestone(&self) -> u32 {
        self.next_milestone
    }

    /// Guests currently assigned to the map spot at `spot`.
    pub fn occupancy(&self, spot: usize) -> Option<u32> {
        self.slots
            .iter()
            .find(|slot| slot.spot == spot)
            .map(|slot| slot.occupants)
    }

    pub fn total_guests(&self) -> u32 {
        self.slots.iter().map(|slot| slot.occupants).sum()
    }

    /// Places `count` guests: one per spot of the lowest order first, then by
    /// [`GuestSpawner::place`]. Returns fewer placements only when the map has no spots.
    pub fn spawn_initial(&mut self, count: usize, rng: &mut impl Rng) -> Vec<GuestPlacement> {
        let mut placements = Vec::with_capacity(count);
        let Some(first_order) = self.slots.first().map(|slot| slot.order) else {
            return placements;
        };

        for index in 0..self.slots.len() {
            if placements.len() == count || self.slots[index].order != first_order {
                break;
            }
            if self.slots[index].has_room() {
                placements.push(self.occupy(index));
            }
        }

        while placements.len() < count {
            match self.place(rng) {
                Some(placement) => placements.push(placement),
                None => break,
            }
        }
        placements
    }

    /// Picks a spot for one guest: a lonely spot that allows company, else any spot with
    /// room left, else any spot at all.
    pub fn place(&mut self, rng: &mut impl Rng) -> Option<GuestPlacement> {
        let index = self
            .pick(rng, SpotSlot::is_lonely)
            .or_else(|| self.pick(rng, SpotSlot::has_room))
            .or_else(|| self.pick(rng, |_| true))?;
        Some(self.occupy(index))
    }

    /// Called with the new resolved-issue count. Spawns a single guest once the count
    /// reaches the current milestone and moves the milestone forward by a random step.
    pub fn on_resolved_count(
        &mut self,
        resolved: u32,
        rng: &mut impl Rng,
    ) -> Option<GuestPlacement> {
        if resolved < self.next_milestone {
            return None;
        }
        let [low, high] = self.milestone_step;
        self.next_milestone += rng.gen_range(low..=high);
        debug!(resolved, next_milestone = self.next_milestone, "guest_milestone_reached");
        self.place(rng)
    }

    fn pick(&self, rng: &mut impl Rng, accept: impl Fn(&SpotSlot) -> bool) -> Option<usize> {
        let candidates: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|&(_, slot)| accept(slot))
            .map(|(index, _)| index)
            .collect();
        candidates.choose(rng).copied()
    }

    fn occupy(&mut self, index: usize) -> GuestPlacement {
        let slot = &mut self.slots[index];
        slot.occupants += 1;
        slot.placement()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn spot(order: i32, limit: u32) -> SpawnPoint {
        SpawnPoint::guest(format!("spot_{order}_{limit}"), Vec2::new(order as f32, 0.0), order, limit)
    }

    #[test]
    fn initial_wave_fills_lowest_order_first() {
        let spots = vec![spot(2, 2), spot(1, 2), spot(1, 2), spot(3, 2)];
        let mut spawner = GuestSpawner::new(&spots, 5, [3, 6]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let placements = spawner.spawn_initial(2, &mut rng);
        let mut placed: Vec<usize> = placements.iter().map(|p| p.spot).collect();
        placed.sort_unstable();
        assert_eq!(placed, vec![1, 2]);
    }

    #[test]
    fn lonely_guests_get_company_before_empty_spots() {
        let spots = vec![spot(0, 3), spot(1, 2), spot(1, 2)];
        let mut spawner = GuestSpawner::new(&spots, 5, [3, 6]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        spawner.spawn_initial(1, &mut rng);
        let second = spawner.place(&mut rng).expect("placement");
        assert_eq!(second.spot, 0);
        assert_eq!(spawner.occupancy(0), Some(2));
    }

    #[test]
    fn spots_never_overflow_while_any_has_room() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        for trial in 0..200 {
            let spot_count = rng.gen_range(1..6);
            let spots: Vec<SpawnPoint> = (0..spot_count)
                .map(|_| spot(rng.gen_range(0..3), rng.gen_range(1..4)))
                .collect();
            let capacity: u32 = spots.iter().map(|s| s.limit).sum();
            let mut spawner = GuestSpawner::new(&spots, 5, [3, 6]);

            let initial = rng.gen_range(0..capacity as usize + 1);
            spawner.spawn_initial(initial, &mut rng);
            let mut placed = initial as u32;
            while placed < capacity {
                spawner.place(&mut rng).expect("placement");
                placed += 1;
                for (index, point) in spots.iter().enumerate() {
                    let occupants = spawner.occupancy(index).expect("spot");
                    assert!(
                        occupants <= point.limit,
                        "trial {trial}: spot {index} holds {occupants} > {}",
                        point.limit
                    );
                }
            }
            assert_eq!(spawner.total_guests(), capacity);
        }
    }

    #[test]
    fn overflow_is_spread_uniformly() {
        let spots = vec![spot(0, 1), spot(0, 1), spot(1, 1), spot(2, 1)];
        let mut spawner = GuestSpawner::new(&spots, 5, [3, 6]);
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        spawner.spawn_initial(spots.len(), &mut rng);

        let trials = 8_000;
        let mut counts = vec![0u32; spots.len()];
        for _ in 0..trials {
            let placement = spawner.place(&mut rng).expect("placement");
            counts[placement.spot] += 1;
        }

        let expected = trials as f64 / spots.len() as f64;
        let chi_square: f64 = counts
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                diff * diff / expected
            })
            .sum();
        // 3 degrees of freedom, p = 0.001
        assert!(chi_square < 16.27, "chi-square {chi_square} for {counts:?}");
    }

    #[test]
    fn milestone_spawns_one_guest_and_advances() {
        let spots = vec![spot(0, 2)];
        let mut spawner = GuestSpawner::new(&spots, 5, [3, 6]);
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        assert!(spawner.on_resolved_count(4, &mut rng).is_none());
        assert!(spawner.on_resolved_count(5, &mut rng).is_some());
        let next = spawner.next_milestone();
        assert!((8..=11).contains(&next), "next milestone {next}");
        assert!(spawner.on_resolved_count(6, &mut rng).is_none());
        assert_eq!(spawner.total_guests(), 1);
    }

    #[test]
    fn empty_map_places_nobody() {
        let mut spawner = GuestSpawner::new(&[], 5, [3, 6]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(spawner.spawn_initial(3, &mut rng).is_empty());
        assert!(spawner.on_resolved_count(10, &mut rng).is_none());
    }
}
