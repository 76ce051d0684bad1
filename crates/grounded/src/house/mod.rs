//! Level geometry: rooms, walls and spawn points, plus the strict level loader.

mod loader;
mod map;

pub use loader::{load_level, parse_level, LevelErrorCode, LevelLoadError, SourceLocation};
pub use map::{
    HouseMap, Obstacle, Room, RoomType, SpawnKind, SpawnPoint, UnknownRoomType,
    DEFAULT_SPOT_LIMIT, DEFAULT_SPOT_ORDER,
};
