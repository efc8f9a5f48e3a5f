//! Raw Map Input
//!
//! The static map model handed over by the map/archive loader: vertices,
//! sectors, sides, lines and placed things. Coordinates and heights are whole
//! map units; the geometry builder converts them to fixed-point.
//!
//! Everything here is plain serde data so a loader (or a test) can produce it
//! from JSON without touching simulation types.

pub mod demo;

use serde::{Serialize, Deserialize};

/// A map vertex in whole map units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapVertex {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl MapVertex {
    /// Create a vertex.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A sector as stored in the map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSector {
    /// Floor height
    pub floor_height: i32,
    /// Ceiling height
    pub ceiling_height: i32,
    /// Floor flat name
    #[serde(default)]
    pub floor_texture: String,
    /// Ceiling flat name
    #[serde(default)]
    pub ceiling_texture: String,
    /// Light level (0-255)
    #[serde(default = "default_light")]
    pub light_level: i16,
    /// Tag used by line specials
    #[serde(default)]
    pub tag: i32,
    /// Sector special number (damage floors, light effects); carried, not simulated
    #[serde(default)]
    pub special: i32,
}

fn default_light() -> i16 {
    160
}

/// One face of a line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSide {
    /// Texture X offset
    #[serde(default)]
    pub offset_x: i32,
    /// Texture Y offset
    #[serde(default)]
    pub offset_y: i32,
    /// Upper texture (visible above the partner sector's ceiling)
    #[serde(default)]
    pub upper_texture: String,
    /// Middle texture
    #[serde(default)]
    pub middle_texture: String,
    /// Lower texture (visible below the partner sector's floor)
    #[serde(default)]
    pub lower_texture: String,
    /// Sector this side faces into
    pub sector: usize,
}

/// Line flags as authored in the map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapLineFlags {
    /// Blocks everything, even when two-sided
    pub blocking: bool,
    /// Blocks players only
    pub block_players: bool,
    /// Blocks monsters only
    pub block_monsters: bool,
    /// The special may be triggered more than once
    pub repeat_special: bool,
    /// Activated by a player pressing use
    pub player_use: bool,
    /// Activated by a player walking across
    pub player_cross: bool,
    /// Activated by a monster walking across
    pub monster_cross: bool,
    /// Activated by a monster bumping into it
    pub monster_use: bool,
}

/// A line as stored in the map. The front side lies to the right of
/// `start -> end`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLine {
    /// Start vertex index
    pub start: usize,
    /// End vertex index
    pub end: usize,
    /// Front side index
    pub front: Option<usize>,
    /// Back side index (two-sided lines only)
    #[serde(default)]
    pub back: Option<usize>,
    /// Flags
    #[serde(default)]
    pub flags: MapLineFlags,
    /// Special number (0 = none)
    #[serde(default)]
    pub special: u16,
    /// Special arguments
    #[serde(default)]
    pub args: [i32; 5],
}

/// Which game modes and skills a thing appears in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapThingFlags {
    /// Skills 1 and 2
    pub easy: bool,
    /// Skill 3
    pub medium: bool,
    /// Skills 4 and 5
    pub hard: bool,
    /// Present in single player games
    pub single_player: bool,
    /// Monster waits for sight or sound before waking
    pub ambush: bool,
}

impl Default for MapThingFlags {
    fn default() -> Self {
        Self {
            easy: true,
            medium: true,
            hard: true,
            single_player: true,
            ambush: false,
        }
    }
}

/// A placed thing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapThing {
    /// X position
    pub x: i32,
    /// Y position
    pub y: i32,
    /// Height above the floor, when the map format carries one
    #[serde(default)]
    pub z: Option<i32>,
    /// Facing in degrees (0 = east)
    #[serde(default)]
    pub angle: i32,
    /// Editor number resolving to an entity definition
    pub editor_id: u16,
    /// Thing id (0 = untagged)
    #[serde(default)]
    pub tid: i32,
    /// Spawn filtering flags
    #[serde(default)]
    pub flags: MapThingFlags,
}

/// A complete map as delivered by the loader.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    /// Lump name, e.g. `MAP01`
    pub name: String,
    /// Vertices
    pub vertices: Vec<MapVertex>,
    /// Sectors
    pub sectors: Vec<MapSector>,
    /// Sides
    pub sides: Vec<MapSide>,
    /// Lines
    pub lines: Vec<MapLine>,
    /// Things
    #[serde(default)]
    pub things: Vec<MapThing>,
}

impl MapData {
    /// Parse a map from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_from_json_applies_defaults() {
        let json = r#"{
            "name": "TEST",
            "vertices": [{"x": 0, "y": 0}, {"x": 0, "y": 64}],
            "sectors": [{"floor_height": 0, "ceiling_height": 128}],
            "sides": [{"sector": 0}],
            "lines": [{"start": 0, "end": 1, "front": 0}],
            "things": [{"x": 8, "y": 8, "editor_id": 1}]
        }"#;

        let map = MapData::from_json(json).unwrap();
        assert_eq!(map.sectors[0].light_level, 160);
        assert_eq!(map.lines[0].back, None);
        assert_eq!(map.lines[0].special, 0);
        assert!(!map.lines[0].flags.repeat_special);
        assert_eq!(map.things[0].z, None);
        assert!(map.things[0].flags.single_player);
        assert!(map.things[0].flags.hard);
    }

    #[test]
    fn test_demo_map_survives_json() {
        let map = demo::door_room();
        let json = map.to_json().unwrap();
        assert_eq!(MapData::from_json(&json).unwrap(), map);
    }
}
