use std::fmt;
use std::str::FromStr;

use engine::{Shape, Vec2};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomType {
    Bathroom,
    Kitchen,
    Bedroom,
    LivingRoom,
    Hall,
    Garden,
}

impl RoomType {
    pub const ALL: [RoomType; 6] = [
        RoomType::Bathroom,
        RoomType::Kitchen,
        RoomType::Bedroom,
        RoomType::LivingRoom,
        RoomType::Hall,
        RoomType::Garden,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoomType::Bathroom => "bathroom",
            RoomType::Kitchen => "kitchen",
            RoomType::Bedroom => "bedroom",
            RoomType::LivingRoom => "livingroom",
            RoomType::Hall => "hall",
            RoomType::Garden => "garden",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRoomType(pub String);

impl FromStr for RoomType {
    type Err = UnknownRoomType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        RoomType::ALL
            .into_iter()
            .find(|room_type| room_type.as_str() == raw)
            .ok_or_else(|| UnknownRoomType(raw.to_string()))
    }
}

/// Axis-aligned room zone, stored by its center.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub room_type: RoomType,
    pub name: String,
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Room {
    pub fn new(room_type: RoomType, name: impl Into<String>, center: Vec2, size: (f32, f32)) -> Self {
        Self {
            room_type,
            name: name.into(),
            center,
            width: size.0.max(0.0),
            height: size.1.max(0.0),
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        (point.x - self.center.x).abs() <= self.width / 2.0
            && (point.y - self.center.y).abs() <= self.height / 2.0
    }

    /// Uniform point inside the room inset by `margin` on every side. An axis narrower
    /// than twice the margin collapses to the room's center line.
    pub fn random_point(&self, rng: &mut impl Rng, margin: f32) -> Vec2 {
        Vec2::new(
            sample_axis(rng, self.center.x, self.width / 2.0 - margin),
            sample_axis(rng, self.center.y, self.height / 2.0 - margin),
        )
    }
}

fn sample_axis(rng: &mut impl Rng, center: f32, half_extent: f32) -> f32 {
    if half_extent > 0.0 {
        rng.gen_range(center - half_extent..=center + half_extent)
    } else {
        center
    }
}

/// Static wall or furniture piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: Vec2,
    pub shape: Shape,
}

impl Obstacle {
    pub fn rect(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            center,
            shape: Shape::rect(width, height),
        }
    }

    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self {
            center,
            shape: Shape::circle(radius),
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.shape.contains(self.center, point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    Player,
    Guest,
}

impl FromStr for SpawnKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "player" => Ok(SpawnKind::Player),
            "guest" => Ok(SpawnKind::Guest),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPoint {
    pub kind: SpawnKind,
    pub name: String,
    pub position: Vec2,
    /// Wave priority; lower orders fill first.
    pub order: i32,
    /// Max simultaneous occupants for guest spots.
    pub limit: u32,
}

pub const DEFAULT_SPOT_ORDER: i32 = 0;
pub const DEFAULT_SPOT_LIMIT: u32 = 2;

impl SpawnPoint {
    pub fn player(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            kind: SpawnKind::Player,
            name: name.into(),
            position,
            order: DEFAULT_SPOT_ORDER,
            limit: 1,
        }
    }

    pub fn guest(name: impl Into<String>, position: Vec2, order: i32, limit: u32) -> Self {
        Self {
            kind: SpawnKind::Guest,
            name: name.into(),
            position,
            order,
            limit,
        }
    }
}

/// Immutable level geometry shared by the spawners and the scene.
#[derive(Debug, Clone, Default)]
pub struct HouseMap {
    walls: Vec<Obstacle>,
    rooms: Vec<Room>,
    player_spawns: Vec<SpawnPoint>,
    guest_spots: Vec<SpawnPoint>,
}

impl HouseMap {
    pub fn new(walls: Vec<Obstacle>, rooms: Vec<Room>, spawns: Vec<SpawnPoint>) -> Self {
        let (player_spawns, guest_spots) = spawns
            .into_iter()
            .partition(|spawn| spawn.kind == SpawnKind::Player);
        Self {
            walls,
            rooms,
            player_spawns,
            guest_spots,
        }
    }

    pub fn walls(&self) -> &[Obstacle] {
        &self.walls
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn player_spawns(&self) -> &[SpawnPoint] {
        &self.player_spawns
    }

    pub fn guest_spots(&self) -> &[SpawnPoint] {
        &self.guest_spots
    }

    pub fn room_index_at(&self, point: Vec2) -> Option<usize> {
        self.rooms.iter().position(|room| room.contains(point))
    }

    pub fn room_at(&self, point: Vec2) -> Option<&Room> {
        self.room_index_at(point).map(|index| &self.rooms[index])
    }

    pub fn is_blocked(&self, point: Vec2) -> bool {
        self.walls.iter().any(|wall| wall.contains(point))
    }

    /// Random player spawn, or the origin for a map without one.
    pub fn player_spawn(&self, rng: &mut impl Rng) -> Vec2 {
        if self.player_spawns.is_empty() {
            return Vec2::ZERO;
        }
        self.player_spawns[rng.gen_range(0..self.player_spawns.len())].position
    }

    /// Samples up to `tries` points inside the room containing `origin` and returns the
    /// first one not covered by a wall. Falls back to `origin` itself when `origin` is in
    /// no room or every sample is blocked.
    pub fn pick_point_near(
        &self,
        origin: Vec2,
        rng: &mut impl Rng,
        margin: f32,
        tries: u32,
    ) -> Vec2 {
        let Some(room) = self.room_at(origin) else {
            return origin;
        };
        (0..tries)
            .map(|_| room.random_point(rng, margin))
            .find(|candidate| !self.is_blocked(*candidate))
            .unwrap_or(origin)
    }
}
