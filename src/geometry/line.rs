//! Lines: the walls of the map.

use serde::{Serialize, Deserialize};

use crate::core::bbox::BoundingBox;
use crate::core::vec2::FixedVec2;
use crate::map::MapLineFlags;
use crate::special::line_special::LineSpecialType;
use super::{LineId, SideId};

/// Packed line flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineFlags(pub u16);

impl LineFlags {
    /// Blocks every mover
    pub const BLOCKING: u16 = 0x0001;
    /// Blocks players
    pub const BLOCK_PLAYERS: u16 = 0x0002;
    /// Blocks monsters
    pub const BLOCK_MONSTERS: u16 = 0x0004;
    /// Has a back side
    pub const TWO_SIDED: u16 = 0x0008;
    /// Special may fire more than once
    pub const REPEAT_SPECIAL: u16 = 0x0010;
    /// Player use activates the special
    pub const PLAYER_USE: u16 = 0x0020;
    /// Player crossing activates the special
    pub const PLAYER_CROSS: u16 = 0x0040;
    /// Monster use activates the special
    pub const MONSTER_USE: u16 = 0x0080;
    /// Monster crossing activates the special
    pub const MONSTER_CROSS: u16 = 0x0100;

    /// Build from authored map flags.
    pub fn from_map(flags: &MapLineFlags, two_sided: bool) -> Self {
        let pairs = [
            (flags.blocking, Self::BLOCKING),
            (flags.block_players, Self::BLOCK_PLAYERS),
            (flags.block_monsters, Self::BLOCK_MONSTERS),
            (two_sided, Self::TWO_SIDED),
            (flags.repeat_special, Self::REPEAT_SPECIAL),
            (flags.player_use, Self::PLAYER_USE),
            (flags.player_cross, Self::PLAYER_CROSS),
            (flags.monster_use, Self::MONSTER_USE),
            (flags.monster_cross, Self::MONSTER_CROSS),
        ];
        Self(pairs.iter().filter(|(set, _)| *set).fold(0, |acc, (_, bit)| acc | bit))
    }

    /// Whether all bits of `mask` are set.
    #[inline]
    pub fn contains(self, mask: u16) -> bool {
        self.0 & mask == mask
    }
}

/// How a line special was triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationContext {
    /// Pressing use against the line
    UseLine,
    /// Walking across the line
    CrossLine,
}

/// The five special arguments of a line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecialArgs(pub [i32; 5]);

impl SpecialArgs {
    /// Sector tag (or tid for teleports): argument 0
    #[inline]
    pub fn sector_tag(&self) -> i32 {
        self.0[0]
    }

    /// Speed in eighths of a unit per tick: argument 1
    #[inline]
    pub fn speed(&self) -> i32 {
        self.0[1]
    }

    /// Delay in ticks: argument 2
    #[inline]
    pub fn delay(&self) -> i32 {
        self.0[2]
    }

    /// Raw argument by index.
    #[inline]
    pub fn arg(&self, index: usize) -> i32 {
        self.0.get(index).copied().unwrap_or(0)
    }
}

/// A wall between two vertices with one or two sides.
#[derive(Clone, Debug)]
pub struct Line {
    /// Index in the line arena
    pub id: LineId,
    /// Start vertex position
    pub start: FixedVec2,
    /// End vertex position
    pub end: FixedVec2,
    /// Front side, lying to the right of `start -> end`
    pub front: SideId,
    /// Back side, present iff the line is two-sided
    pub back: Option<SideId>,
    /// Flags
    pub flags: LineFlags,
    /// Special executed on activation
    pub special: LineSpecialType,
    /// Special arguments
    pub args: SpecialArgs,
    /// Set once a special fired from this line
    pub activated: bool,
    /// Number of runtime texture changes (switches), persisted in snapshots
    pub data_changes: u32,
    /// Bounds of the segment
    pub bbox: BoundingBox,
}

impl Line {
    /// Direction vector from start to end.
    #[inline]
    pub fn delta(&self) -> FixedVec2 {
        self.end - self.start
    }

    /// True if the line has no back side.
    #[inline]
    pub fn is_one_sided(&self) -> bool {
        self.back.is_none()
    }

    /// The line's sides: front, then back when two-sided.
    pub fn sides(&self) -> impl Iterator<Item = SideId> {
        std::iter::once(self.front).chain(self.back)
    }

    /// True if a special is attached.
    #[inline]
    pub fn has_special(&self) -> bool {
        !self.special.is_none()
    }

    /// True if the special may fire more than once.
    #[inline]
    pub fn is_repeatable(&self) -> bool {
        self.flags.contains(LineFlags::REPEAT_SPECIAL)
    }

    /// Whether this activation context and mover kind may trigger the special.
    pub fn can_activate(&self, context: ActivationContext, is_player: bool) -> bool {
        let mask = match (context, is_player) {
            (ActivationContext::UseLine, true) => LineFlags::PLAYER_USE,
            (ActivationContext::UseLine, false) => LineFlags::MONSTER_USE,
            (ActivationContext::CrossLine, true) => LineFlags::PLAYER_CROSS,
            (ActivationContext::CrossLine, false) => LineFlags::MONSTER_CROSS,
        };
        self.has_special() && self.flags.contains(mask)
    }

    /// Whether the line stops a mover of the given kind.
    ///
    /// One-sided lines always block. Two-sided lines block when flagged for
    /// everyone or for the mover's category.
    pub fn blocks_entity(&self, is_player: bool, is_monster: bool) -> bool {
        self.is_one_sided()
            || self.flags.contains(LineFlags::BLOCKING)
            || (is_player && self.flags.contains(LineFlags::BLOCK_PLAYERS))
            || (is_monster && self.flags.contains(LineFlags::BLOCK_MONSTERS))
    }

    /// True if `point` lies on the front (right) side or on the line.
    #[inline]
    pub fn on_front(&self, point: FixedVec2) -> bool {
        self.delta().cross_wide(point - self.start) <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(back: Option<SideId>, flags: u16) -> Line {
        let start = FixedVec2::from_ints(0, 0);
        let end = FixedVec2::from_ints(0, 64);
        Line {
            id: 0,
            start,
            end,
            front: 0,
            back,
            flags: LineFlags(flags),
            special: LineSpecialType::None,
            args: SpecialArgs::default(),
            activated: false,
            data_changes: 0,
            bbox: BoundingBox::new(start, end),
        }
    }

    #[test]
    fn test_one_sided_always_blocks() {
        let wall = line(None, 0);
        assert!(wall.blocks_entity(true, false));
        assert!(wall.blocks_entity(false, true));
        assert!(wall.blocks_entity(false, false));
        assert_eq!(wall.sides().count(), 1);
    }

    #[test]
    fn test_two_sided_blocks_by_category() {
        let open = line(Some(1), LineFlags::TWO_SIDED);
        assert!(!open.blocks_entity(true, false));
        assert_eq!(open.sides().collect::<Vec<_>>(), vec![0, 1]);

        let players = line(Some(1), LineFlags::TWO_SIDED | LineFlags::BLOCK_PLAYERS);
        assert!(players.blocks_entity(true, false));
        assert!(!players.blocks_entity(false, true));

        let monsters = line(Some(1), LineFlags::TWO_SIDED | LineFlags::BLOCK_MONSTERS);
        assert!(!monsters.blocks_entity(true, false));
        assert!(monsters.blocks_entity(false, true));

        let all = line(Some(1), LineFlags::TWO_SIDED | LineFlags::BLOCKING);
        assert!(all.blocks_entity(false, false));
    }

    #[test]
    fn test_front_is_right_of_direction() {
        // Line runs north, so east is the front
        let wall = line(None, 0);
        assert!(wall.on_front(FixedVec2::from_ints(10, 32)));
        assert!(!wall.on_front(FixedVec2::from_ints(-10, 32)));
    }

    #[test]
    fn test_flags_from_map() {
        let flags = LineFlags::from_map(
            &MapLineFlags { blocking: true, player_use: true, ..MapLineFlags::default() },
            true,
        );
        assert!(flags.contains(LineFlags::BLOCKING | LineFlags::PLAYER_USE | LineFlags::TWO_SIDED));
        assert!(!flags.contains(LineFlags::REPEAT_SPECIAL));
    }
}
