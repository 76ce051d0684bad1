use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use engine::Vec2;
use roxmltree::{Document, Node};
use tracing::{debug, info};

use super::map::{
    HouseMap, Obstacle, Room, RoomType, SpawnKind, SpawnPoint, DEFAULT_SPOT_LIMIT,
    DEFAULT_SPOT_ORDER,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownRoomType,
    UnknownSpawnType,
    MissingAttribute,
    InvalidNumber,
    MissingPlayerSpawn,
    MissingGuestSpot,
}

#[derive(Debug, Clone)]
pub struct LevelLoadError {
    pub code: LevelErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for LevelLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for LevelLoadError {}

pub fn load_level(path: &Path) -> Result<HouseMap, LevelLoadError> {
    let raw = fs::read_to_string(path).map_err(|error| LevelLoadError {
        code: LevelErrorCode::ReadFile,
        message: format!("failed to read level: {error}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    parse_level(path, &raw)
}

/// Parses a Tiled-style `<map>` document. Object coordinates are top-left corners and are
/// converted to centers. Unknown object groups are skipped; missing groups yield empty
/// collections, but the map must provide a player spawn and at least one guest spot.
pub fn parse_level(file_path: &Path, raw: &str) -> Result<HouseMap, LevelLoadError> {
    let doc = Document::parse(raw).map_err(|error| LevelLoadError {
        code: LevelErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = ParseContext {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(ctx.error_at(
            LevelErrorCode::InvalidRoot,
            format!("root element must be <map>, found <{}>", root.tag_name().name()),
            root,
        ));
    }

    let mut walls = Vec::new();
    let mut rooms = Vec::new();
    let mut spawns = Vec::new();
    for group in root
        .children()
        .filter(|node| node.has_tag_name("objectgroup"))
    {
        let objects = group.children().filter(|node| node.has_tag_name("object"));
        match group.attribute("name").unwrap_or_default() {
            "walls" => {
                for object in objects {
                    walls.push(ctx.parse_wall(object)?);
                }
            }
            "rooms" => {
                for object in objects {
                    rooms.push(ctx.parse_room(object)?);
                }
            }
            "spawns" => {
                for object in objects {
                    spawns.push(ctx.parse_spawn(object)?);
                }
            }
            other => debug!(group = other, "level_group_skipped"),
        }
    }

    let map = HouseMap::new(walls, rooms, spawns);
    if map.player_spawns().is_empty() {
        return Err(ctx.error_at(
            LevelErrorCode::MissingPlayerSpawn,
            "level has no spawn with type=\"player\"".to_string(),
            root,
        ));
    }
    if map.guest_spots().is_empty() {
        return Err(ctx.error_at(
            LevelErrorCode::MissingGuestSpot,
            "level has no spawn with type=\"guest\"".to_string(),
            root,
        ));
    }

    info!(
        file = %file_path.display(),
        walls = map.walls().len(),
        rooms = map.rooms().len(),
        guest_spots = map.guest_spots().len(),
        "level_loaded"
    );
    Ok(map)
}

struct ParseContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

struct ObjectBounds {
    center: Vec2,
    width: f32,
    height: f32,
}

impl ParseContext<'_, '_> {
    fn parse_wall(&self, object: Node<'_, '_>) -> Result<Obstacle, LevelLoadError> {
        let bounds = self.bounds(object)?;
        if object.children().any(|child| child.has_tag_name("ellipse")) {
            Ok(Obstacle::circle(
                bounds.center,
                bounds.width.min(bounds.height) / 2.0,
            ))
        } else {
            Ok(Obstacle::rect(bounds.center, bounds.width, bounds.height))
        }
    }

    fn parse_room(&self, object: Node<'_, '_>) -> Result<Room, LevelLoadError> {
        let bounds = self.bounds(object)?;
        let raw_type = self.object_type(object)?;
        let room_type = raw_type.parse::<RoomType>().map_err(|unknown| {
            self.error_at(
                LevelErrorCode::UnknownRoomType,
                format!(
                    "unknown room type '{}'; expected one of bathroom, kitchen, bedroom, livingroom, hall, garden",
                    unknown.0
                ),
                object,
            )
        })?;
        let name = object.attribute("name").unwrap_or(raw_type);
        Ok(Room::new(
            room_type,
            name,
            bounds.center,
            (bounds.width, bounds.height),
        ))
    }

    fn parse_spawn(&self, object: Node<'_, '_>) -> Result<SpawnPoint, LevelLoadError> {
        let bounds = self.bounds(object)?;
        let raw_type = self.object_type(object)?;
        let kind = raw_type.parse::<SpawnKind>().map_err(|unknown| {
            self.error_at(
                LevelErrorCode::UnknownSpawnType,
                format!("unknown spawn type '{unknown}'; expected player or guest"),
                object,
            )
        })?;
        let name = object.attribute("name").unwrap_or_default();

        match kind {
            SpawnKind::Player => Ok(SpawnPoint::player(name, bounds.center)),
            SpawnKind::Guest => {
                let order = self
                    .property(object, "order")?
                    .unwrap_or(DEFAULT_SPOT_ORDER as f64);
                let limit = self
                    .property(object, "limit")?
                    .unwrap_or(DEFAULT_SPOT_LIMIT as f64);
                if limit < 0.0 || limit.fract() != 0.0 || order.fract() != 0.0 {
                    return Err(self.error_at(
                        LevelErrorCode::InvalidNumber,
                        format!("guest spot order/limit must be whole numbers (order={order}, limit={limit})"),
                        object,
                    ));
                }
                Ok(SpawnPoint::guest(
                    name,
                    bounds.center,
                    order as i32,
                    limit as u32,
                ))
            }
        }
    }

    fn bounds(&self, object: Node<'_, '_>) -> Result<ObjectBounds, LevelLoadError> {
        let x = self.required_number(object, "x")?;
        let y = self.required_number(object, "y")?;
        let width = self.optional_number(object, "width")?.unwrap_or(0.0);
        let height = self.optional_number(object, "height")?.unwrap_or(0.0);
        Ok(ObjectBounds {
            center: Vec2::new(x + width / 2.0, y + height / 2.0),
            width,
            height,
        })
    }

    /// Newer Tiled versions write `class` where older ones wrote `type`.
    fn object_type<'n>(&self, object: Node<'n, '_>) -> Result<&'n str, LevelLoadError> {
        object
            .attribute("type")
            .or_else(|| object.attribute("class"))
            .ok_or_else(|| {
                self.error_at(
                    LevelErrorCode::MissingAttribute,
                    "object is missing its type attribute".to_string(),
                    object,
                )
            })
    }

    fn required_number(&self, object: Node<'_, '_>, attr: &str) -> Result<f32, LevelLoadError> {
        self.optional_number(object, attr)?.ok_or_else(|| {
            self.error_at(
                LevelErrorCode::MissingAttribute,
                format!("object is missing required attribute '{attr}'"),
                object,
            )
        })
    }

    fn optional_number(
        &self,
        object: Node<'_, '_>,
        attr: &str,
    ) -> Result<Option<f32>, LevelLoadError> {
        let Some(raw) = object.attribute(attr) else {
            return Ok(None);
        };
        match raw.trim().parse::<f32>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(self.error_at(
                LevelErrorCode::InvalidNumber,
                format!("attribute '{attr}' has invalid number '{raw}'"),
                object,
            )),
        }
    }

    fn property(&self, object: Node<'_, '_>, name: &str) -> Result<Option<f64>, LevelLoadError> {
        let Some(property) = object
            .children()
            .filter(|node| node.has_tag_name("properties"))
            .flat_map(|properties| properties.children())
            .find(|node| node.has_tag_name("property") && node.attribute("name") == Some(name))
        else {
            return Ok(None);
        };
        let raw = property.attribute("value").unwrap_or_default();
        raw.trim().parse::<f64>().map(Some).map_err(|_| {
            self.error_at(
                LevelErrorCode::InvalidNumber,
                format!("property '{name}' has invalid number '{raw}'"),
                property,
            )
        })
    }

    fn error_at(&self, code: LevelErrorCode, message: String, node: Node<'_, '_>) -> LevelLoadError {
        let pos = self.doc.text_pos_at(node.range().start);
        LevelLoadError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<HouseMap, LevelLoadError> {
        parse_level(Path::new("test.xml"), raw)
    }

    const MINIMAL: &str = r#"<map>
        <objectgroup name="spawns">
          <object name="start" type="player" x="10" y="20"><point/></object>
          <object name="sofa" type="guest" x="100" y="100"><point/></object>
        </objectgroup>
      </map>"#;

    #[test]
    fn full_level_parses_every_group() {
        let map = parse(
            r#"<map version="1.10">
              <objectgroup name="walls">
                <object id="1" x="0" y="0" width="100" height="20"/>
                <object id="2" x="200" y="200" width="40" height="60"><ellipse/></object>
              </objectgroup>
              <objectgroup name="rooms">
                <object id="3" name="Big Kitchen" type="kitchen" x="0" y="0" width="400" height="300"/>
                <object id="4" class="garden" x="400" y="0" width="100" height="100"/>
              </objectgroup>
              <objectgroup name="spawns">
                <object name="start" type="player" x="50" y="50"><point/></object>
                <object name="bar" type="guest" x="120" y="80">
                  <properties>
                    <property name="order" type="int" value="1"/>
                    <property name="limit" type="int" value="4"/>
                  </properties>
                  <point/>
                </object>
              </objectgroup>
              <objectgroup name="decor"/>
            </map>"#,
        )
        .expect("parse");

        assert_eq!(map.walls().len(), 2);
        assert_eq!(map.walls()[0], Obstacle::rect(Vec2::new(50.0, 10.0), 100.0, 20.0));
        assert_eq!(map.walls()[1], Obstacle::circle(Vec2::new(220.0, 230.0), 20.0));

        assert_eq!(map.rooms().len(), 2);
        assert_eq!(map.rooms()[0].name, "Big Kitchen");
        assert_eq!(map.rooms()[0].center, Vec2::new(200.0, 150.0));
        assert_eq!(map.rooms()[1].room_type, RoomType::Garden);

        let spot = &map.guest_spots()[0];
        assert_eq!((spot.order, spot.limit), (1, 4));
        assert_eq!(map.player_spawns()[0].position, Vec2::new(50.0, 50.0));
    }

    #[test]
    fn missing_groups_yield_empty_collections() {
        let map = parse(MINIMAL).expect("parse");
        assert!(map.walls().is_empty());
        assert!(map.rooms().is_empty());
        let spot = &map.guest_spots()[0];
        assert_eq!((spot.order, spot.limit), (DEFAULT_SPOT_ORDER, DEFAULT_SPOT_LIMIT));
    }

    #[test]
    fn unknown_room_type_fails_closed_with_location() {
        let err = parse(
            r#"<map>
              <objectgroup name="rooms">
                <object type="attic" x="0" y="0" width="10" height="10"/>
              </objectgroup>
            </map>"#,
        )
        .expect_err("unknown room");
        assert_eq!(err.code, LevelErrorCode::UnknownRoomType);
        assert_eq!(err.location.map(|loc| loc.line), Some(3));
    }

    #[test]
    fn unknown_spawn_type_errors() {
        let err = parse(
            r#"<map><objectgroup name="spawns">
              <object type="cat" x="0" y="0"/>
            </objectgroup></map>"#,
        )
        .expect_err("unknown spawn");
        assert_eq!(err.code, LevelErrorCode::UnknownSpawnType);
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = parse(
            r#"<map><objectgroup name="walls">
              <object x="abc" y="0" width="1" height="1"/>
            </objectgroup></map>"#,
        )
        .expect_err("bad number");
        assert_eq!(err.code, LevelErrorCode::InvalidNumber);

        let err = parse(
            r#"<map><objectgroup name="walls"><object y="0"/></objectgroup></map>"#,
        )
        .expect_err("missing x");
        assert_eq!(err.code, LevelErrorCode::MissingAttribute);
    }

    #[test]
    fn level_without_player_or_guest_spawn_is_rejected() {
        let err = parse(r#"<map/>"#).expect_err("no spawns");
        assert_eq!(err.code, LevelErrorCode::MissingPlayerSpawn);

        let err = parse(
            r#"<map><objectgroup name="spawns">
              <object type="player" x="0" y="0"/>
            </objectgroup></map>"#,
        )
        .expect_err("no guests");
        assert_eq!(err.code, LevelErrorCode::MissingGuestSpot);
    }

    #[test]
    fn malformed_xml_and_wrong_root() {
        let err = parse("<map><objectgroup></map>").expect_err("malformed");
        assert_eq!(err.code, LevelErrorCode::XmlMalformed);
        assert!(err.location.is_some());

        let err = parse("<level/>").expect_err("root");
        assert_eq!(err.code, LevelErrorCode::InvalidRoot);
    }

    #[test]
    fn load_level_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("house.xml");
        fs::write(&path, MINIMAL).expect("write");
        let map = load_level(&path).expect("load");
        assert_eq!(map.player_spawns()[0].position, Vec2::new(10.0, 20.0));

        let err = load_level(&dir.path().join("missing.xml")).expect_err("missing");
        assert_eq!(err.code, LevelErrorCode::ReadFile);
    }

    #[test]
    fn shipped_house_loads_with_every_room_type() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/levels/basic_house.xml");
        let map = load_level(&path).expect("shipped level");
        for room_type in RoomType::ALL {
            assert!(
                map.rooms().iter().any(|room| room.room_type == room_type),
                "no {room_type} room"
            );
        }
        for spot in map.guest_spots() {
            assert!(!map.is_blocked(spot.position), "spot {} is inside a wall", spot.name);
            assert!(map.room_at(spot.position).is_some(), "spot {} is outside the house", spot.name);
        }
        let start = map.player_spawns()[0].position;
        assert_eq!(map.room_at(start).map(|room| room.room_type), Some(RoomType::Hall));
    }
}
