//! Built-in demo maps.
//!
//! Used by the binary, the benchmarks and the tests so every layer runs
//! against the same hand-checked geometry.
//!
//! ```text
//!  y=256 ┌──────────────┐   ┌──────────────────────┐
//!        │              │   │                      │
//!        │   room A     ├───┤       room B         │
//!        │  (sector 0)  │ D │     (sector 2)   ┌─┐ │
//!   use ─┤ switch       ├───┤                  │L│ ├─ teleport
//!        │              │   │                  └─┘ │
//!  y=0   └──────────────┘   └──────────────────────┘
//!        x=0        x=256  x=272                 x=528
//! ```
//!
//! `D` is the door sector (tag 5, closed), `L` the lift platform (24 units
//! above room B).

use super::{MapData, MapLine, MapLineFlags, MapSector, MapSide, MapThing, MapThingFlags, MapVertex};

/// Sector index of room A in [`door_room`].
pub const ROOM_A: usize = 0;
/// Sector index of the door in [`door_room`].
pub const DOOR_SECTOR: usize = 1;
/// Sector index of room B in [`door_room`].
pub const ROOM_B: usize = 2;
/// Sector index of the lift platform in [`door_room`].
pub const LIFT_SECTOR: usize = 3;

/// Tag shared by the door sector and its remote switch.
pub const DOOR_TAG: i32 = 5;
/// Tid of the teleport destination in room A.
pub const TELEPORT_TID: i32 = 7;

/// Line index of the remote door switch on room A's west wall.
pub const SWITCH_LINE: usize = 0;
/// Line index of the door face seen from room A.
pub const DOOR_LINE_A: usize = 3;
/// Line index of the door face seen from room B.
pub const DOOR_LINE_B: usize = 8;
/// Line index of the teleporter wall in room B.
pub const TELEPORT_LINE: usize = 11;
/// Line index of the lift's east face.
pub const LIFT_LINE: usize = 15;

const DOOR_OPEN: u16 = 11;
const DOOR_RAISE: u16 = 12;
const PLAT_DOWN_WAIT_UP_STAY: u16 = 62;
const TELEPORT: u16 = 70;

#[derive(Default)]
struct DemoBuilder {
    map: MapData,
}

impl DemoBuilder {
    fn new(name: &str) -> Self {
        Self {
            map: MapData { name: name.to_string(), ..MapData::default() },
        }
    }

    fn vertices(&mut self, points: &[(i32, i32)]) {
        self.map.vertices.extend(points.iter().map(|&(x, y)| MapVertex::new(x, y)));
    }

    fn sector(&mut self, floor: i32, ceiling: i32, light: i16, tag: i32) -> usize {
        self.map.sectors.push(MapSector {
            floor_height: floor,
            ceiling_height: ceiling,
            floor_texture: "FLOOR4_8".to_string(),
            ceiling_texture: "CEIL3_5".to_string(),
            light_level: light,
            tag,
            special: 0,
        });
        self.map.sectors.len() - 1
    }

    fn side(&mut self, sector: usize, middle: &str, upper: &str, lower: &str) -> usize {
        self.map.sides.push(MapSide {
            offset_x: 0,
            offset_y: 0,
            upper_texture: upper.to_string(),
            middle_texture: middle.to_string(),
            lower_texture: lower.to_string(),
            sector,
        });
        self.map.sides.len() - 1
    }

    fn one_sided(&mut self, start: usize, end: usize, sector: usize, texture: &str) -> usize {
        let front = self.side(sector, texture, "", "");
        self.map.lines.push(MapLine {
            start,
            end,
            front: Some(front),
            back: None,
            flags: MapLineFlags::default(),
            special: 0,
            args: [0; 5],
        });
        self.map.lines.len() - 1
    }

    fn two_sided(&mut self, start: usize, end: usize, front: usize, back: usize, upper: &str) -> usize {
        let front = self.side(front, "", upper, "STEP1");
        let back = self.side(back, "", upper, "STEP1");
        self.map.lines.push(MapLine {
            start,
            end,
            front: Some(front),
            back: Some(back),
            flags: MapLineFlags::default(),
            special: 0,
            args: [0; 5],
        });
        self.map.lines.len() - 1
    }

    fn special(&mut self, line: usize, special: u16, args: [i32; 5], repeat: bool) {
        let line = &mut self.map.lines[line];
        line.special = special;
        line.args = args;
        line.flags.player_use = true;
        line.flags.repeat_special = repeat;
    }

    fn thing(&mut self, x: i32, y: i32, angle: i32, editor_id: u16, tid: i32, flags: MapThingFlags) {
        self.map.things.push(MapThing { x, y, z: None, angle, editor_id, tid, flags });
    }
}

/// Two rooms joined by a closed door, with a remote door switch, a local lift
/// and a teleporter back into the first room.
pub fn door_room() -> MapData {
    let mut b = DemoBuilder::new("DEMO01");

    b.vertices(&[
        (0, 0), (0, 256), (256, 256), (256, 160), (256, 96), (256, 0),
        (272, 160), (272, 96),
        (272, 256), (528, 256), (528, 0), (272, 0),
        (400, 64), (400, 128), (464, 128), (464, 64),
    ]);

    let room_a = b.sector(0, 128, 192, 0);
    let door = b.sector(0, 0, 160, DOOR_TAG);
    let room_b = b.sector(0, 160, 176, 0);
    let lift = b.sector(24, 160, 176, 0);

    // Room A, clockwise so the room lies on the right of every line
    let switch = b.one_sided(0, 1, room_a, "SW1COMP");
    b.one_sided(1, 2, room_a, "STARTAN3");
    b.one_sided(2, 3, room_a, "STARTAN3");
    let door_a = b.two_sided(3, 4, room_a, door, "BIGDOOR2");
    b.one_sided(4, 5, room_a, "STARTAN3");
    b.one_sided(5, 0, room_a, "STARTAN3");

    // Door jambs and the door face towards room B
    b.one_sided(3, 6, door, "DOORTRAK");
    b.one_sided(7, 4, door, "DOORTRAK");
    let door_b = b.two_sided(7, 6, room_b, door, "BIGDOOR2");

    // Room B
    b.one_sided(6, 8, room_b, "STARTAN3");
    b.one_sided(8, 9, room_b, "STARTAN3");
    let teleporter = b.one_sided(9, 10, room_b, "GATE3");
    b.one_sided(10, 11, room_b, "STARTAN3");
    b.one_sided(11, 7, room_b, "STARTAN3");

    // Lift platform, faced from room B
    b.two_sided(12, 15, room_b, lift, "");
    let lift_face = b.two_sided(15, 14, room_b, lift, "");
    b.two_sided(14, 13, room_b, lift, "");
    b.two_sided(13, 12, room_b, lift, "");

    b.special(switch, DOOR_OPEN, [DOOR_TAG, 16, 0, 0, 0], false);
    b.special(door_a, DOOR_RAISE, [0, 16, 150, 0, 0], true);
    b.special(door_b, DOOR_RAISE, [0, 16, 150, 0, 0], true);
    b.special(lift_face, PLAT_DOWN_WAIT_UP_STAY, [0, 32, 70, 0, 0], true);
    b.special(teleporter, TELEPORT, [TELEPORT_TID, 0, 0, 0, 0], true);

    debug_assert_eq!(switch, SWITCH_LINE);
    debug_assert_eq!(door_a, DOOR_LINE_A);
    debug_assert_eq!(door_b, DOOR_LINE_B);
    debug_assert_eq!(teleporter, TELEPORT_LINE);
    debug_assert_eq!(lift_face, LIFT_LINE);

    let all = MapThingFlags::default();
    let hard_only = MapThingFlags { easy: false, medium: false, ..all };
    let multiplayer_only = MapThingFlags { single_player: false, ..all };

    b.thing(32, 128, 0, 1, 0, all);
    b.thing(32, 64, 0, 2, 0, all);
    b.thing(200, 40, 90, 11, 0, all);
    b.thing(128, 200, 270, 14, TELEPORT_TID, all);
    b.thing(128, 64, 0, 2007, 0, all);
    b.thing(160, 64, 0, 2014, 0, all);
    b.thing(200, 200, 0, 2035, 0, all);
    b.thing(480, 200, 180, 3001, 0, all);
    b.thing(350, 200, 180, 3004, 0, hard_only);
    b.thing(320, 40, 0, 2001, 0, multiplayer_only);
    b.thing(432, 96, 0, 5, 0, all);

    b.map
}

/// A single square room of the given size with the player 1 start in the
/// middle. Sector 0 spans `(0, 0)` to `(size, size)`.
pub fn square_room(size: i32, floor: i32, ceiling: i32) -> MapData {
    let mut b = DemoBuilder::new("SQUARE");
    b.vertices(&[(0, 0), (0, size), (size, size), (size, 0)]);
    let room = b.sector(floor, ceiling, 160, 0);
    for i in 0..4 {
        b.one_sided(i, (i + 1) % 4, room, "STARTAN3");
    }
    b.thing(size / 2, size / 2, 90, 1, 0, MapThingFlags::default());
    b.map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_door_room_indices() {
        let map = door_room();
        assert_eq!(map.sectors.len(), 4);
        assert_eq!(map.lines.len(), 18);
        assert_eq!(map.sectors[DOOR_SECTOR].tag, DOOR_TAG);
        assert_eq!(map.lines[SWITCH_LINE].args[0], DOOR_TAG);
        assert!(!map.lines[SWITCH_LINE].flags.repeat_special);
        assert_eq!(map.lines[DOOR_LINE_A].back.map(|s| map.sides[s].sector), Some(DOOR_SECTOR));
        assert_eq!(map.lines[LIFT_LINE].back.map(|s| map.sides[s].sector), Some(LIFT_SECTOR));
    }

    #[test]
    fn test_square_room_is_closed() {
        let map = square_room(256, 0, 128);
        assert_eq!(map.lines.len(), 4);
        assert_eq!(map.lines[3].end, map.lines[0].start);
    }
}
