//! Line special catalog.
//!
//! Maps special numbers (ZDoom/Hexen numbering) to what they do: which plane
//! of which sectors moves where, how fast, and what happens at the end of the
//! move.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::geometry::{SectorPlaneFace, SpecialArgs};

/// Default crush damage when the line does not give one.
pub const DEFAULT_CRUSH_DAMAGE: i32 = 10;

/// Known line specials.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineSpecialType {
    /// No special
    None,
    /// Door_Close (tag, speed)
    DoorClose,
    /// Door_Open (tag, speed): stays open
    DoorOpen,
    /// Door_Raise (tag, speed, delay): opens, waits, closes
    DoorRaise,
    /// Floor_LowerToLowest (tag, speed)
    FloorLowerToLowest,
    /// Floor_RaiseToHighest (tag, speed)
    FloorRaiseToHighest,
    /// Floor_LowerToHighest (tag, speed)
    FloorLowerToHighest,
    /// Ceiling_LowerToFloor (tag, speed)
    CeilingLowerToFloor,
    /// Ceiling_CrushAndRaise (tag, speed, crush): perpetual crusher
    CeilingCrushAndRaise,
    /// Ceiling_LowerAndCrush (tag, speed, crush)
    CeilingLowerAndCrush,
    /// Plat_PerpetualRaise (tag, speed, delay)
    PlatPerpetualRaise,
    /// Plat_DownWaitUpStay (tag, speed, delay): lift
    PlatDownWaitUpStay,
    /// Teleport (tid, tag)
    Teleport,
    /// Teleport_NoFog (tid, tag)
    TeleportNoFog,
}

impl LineSpecialType {
    /// Resolve a special number. `None` for numbers this engine does not know.
    pub fn from_number(number: u16) -> Option<Self> {
        Some(match number {
            0 => Self::None,
            10 => Self::DoorClose,
            11 => Self::DoorOpen,
            12 => Self::DoorRaise,
            21 => Self::FloorLowerToLowest,
            24 => Self::FloorRaiseToHighest,
            42 => Self::CeilingCrushAndRaise,
            43 => Self::CeilingLowerAndCrush,
            60 => Self::PlatPerpetualRaise,
            62 => Self::PlatDownWaitUpStay,
            70 => Self::Teleport,
            71 => Self::TeleportNoFog,
            242 => Self::FloorLowerToHighest,
            254 => Self::CeilingLowerToFloor,
            _ => return None,
        })
    }

    /// The special number.
    pub fn number(self) -> u16 {
        match self {
            Self::None => 0,
            Self::DoorClose => 10,
            Self::DoorOpen => 11,
            Self::DoorRaise => 12,
            Self::FloorLowerToLowest => 21,
            Self::FloorRaiseToHighest => 24,
            Self::CeilingCrushAndRaise => 42,
            Self::CeilingLowerAndCrush => 43,
            Self::PlatPerpetualRaise => 60,
            Self::PlatDownWaitUpStay => 62,
            Self::Teleport => 70,
            Self::TeleportNoFog => 71,
            Self::FloorLowerToHighest => 242,
            Self::CeilingLowerToFloor => 254,
        }
    }

    /// True for [`LineSpecialType::None`].
    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// True for teleporters.
    #[inline]
    pub fn is_teleport(self) -> bool {
        matches!(self, Self::Teleport | Self::TeleportNoFog)
    }

    /// True for doors that toggle closed when triggered while already open.
    #[inline]
    pub fn is_door(self) -> bool {
        matches!(self, Self::DoorOpen | Self::DoorRaise)
    }

    /// How the special moves a sector, or `None` if it does not.
    pub fn sector_move(self, args: &SpecialArgs) -> Option<SectorMoveData> {
        let speed = speed_from_arg(args.speed());
        let delay = args.delay().max(0) as u32;
        let crush_damage = if args.delay() > 0 { args.delay() } else { DEFAULT_CRUSH_DAMAGE };

        use SectorDest as Dest;
        use SectorPlaneFace as Face;
        let (face, dest, repetition, crush) = match self {
            Self::DoorClose => (Face::Ceiling, Dest::Floor, MoveRepetition::None, CrushMode::None),
            Self::DoorOpen => (Face::Ceiling, Dest::HighestAdjacentCeiling, MoveRepetition::None, CrushMode::None),
            Self::DoorRaise => (
                Face::Ceiling,
                Dest::HighestAdjacentCeiling,
                MoveRepetition::DelayReturn { delay },
                CrushMode::None,
            ),
            Self::FloorLowerToLowest => (Face::Floor, Dest::LowestAdjacentFloor, MoveRepetition::None, CrushMode::None),
            Self::FloorRaiseToHighest => (Face::Floor, Dest::HighestAdjacentFloor, MoveRepetition::None, CrushMode::None),
            Self::FloorLowerToHighest => (Face::Floor, Dest::HighestAdjacentFloor, MoveRepetition::None, CrushMode::None),
            Self::CeilingLowerToFloor => (Face::Ceiling, Dest::Floor, MoveRepetition::None, CrushMode::None),
            Self::CeilingCrushAndRaise => (
                Face::Ceiling,
                Dest::Floor,
                MoveRepetition::Perpetual { delay: 0 },
                CrushMode::Damage(crush_damage),
            ),
            Self::CeilingLowerAndCrush => (Face::Ceiling, Dest::Floor, MoveRepetition::None, CrushMode::Damage(crush_damage)),
            Self::PlatPerpetualRaise => (
                Face::Floor,
                Dest::LowestAdjacentFloor,
                MoveRepetition::Perpetual { delay },
                CrushMode::None,
            ),
            Self::PlatDownWaitUpStay => (
                Face::Floor,
                Dest::LowestAdjacentFloor,
                MoveRepetition::DelayReturn { delay },
                CrushMode::None,
            ),
            Self::None | Self::Teleport | Self::TeleportNoFog => return None,
        };

        Some(SectorMoveData { face, dest, speed, repetition, crush })
    }
}

/// Line speed arguments are in eighths of a map unit per tick.
#[inline]
pub fn speed_from_arg(arg: i32) -> Fixed {
    arg.saturating_mul(FIXED_ONE / 8)
}

/// Where a sector mover is heading, relative to the moved sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorDest {
    /// Lowest floor among adjacent sectors
    LowestAdjacentFloor,
    /// Highest floor among adjacent sectors
    HighestAdjacentFloor,
    /// Lowest ceiling among adjacent sectors
    LowestAdjacentCeiling,
    /// Highest ceiling among adjacent sectors
    HighestAdjacentCeiling,
    /// The sector's own floor
    Floor,
    /// The sector's own ceiling
    Ceiling,
}

/// What happens once a mover reaches its destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveRepetition {
    /// Stop there
    None,
    /// Wait `delay` ticks, then go back to the start height and stop
    DelayReturn {
        /// Ticks to wait at the destination
        delay: u32,
    },
    /// Bounce between start and destination forever, waiting `delay` ticks
    /// at each end
    Perpetual {
        /// Ticks to wait at either end
        delay: u32,
    },
}

/// Reaction to an entity that does not fit under the moving plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrushMode {
    /// Reverse direction (doors bouncing off players)
    None,
    /// Hold position and deal this much damage every few ticks
    Damage(i32),
}

/// Resolved description of a sector-moving special.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorMoveData {
    /// Which plane moves
    pub face: SectorPlaneFace,
    /// Destination rule
    pub dest: SectorDest,
    /// Units per tick
    pub speed: Fixed,
    /// End-of-move behavior
    pub repetition: MoveRepetition,
    /// Obstruction behavior
    pub crush: CrushMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_round_trip() {
        for number in [0u16, 10, 11, 12, 21, 24, 42, 43, 60, 62, 70, 71, 242, 254] {
            let special = LineSpecialType::from_number(number).unwrap();
            assert_eq!(special.number(), number);
        }
        assert_eq!(LineSpecialType::from_number(9999), None);
    }

    #[test]
    fn test_door_open_data() {
        let args = SpecialArgs([5, 16, 0, 0, 0]);
        let data = LineSpecialType::DoorOpen.sector_move(&args).unwrap();
        assert_eq!(data.face, SectorPlaneFace::Ceiling);
        assert_eq!(data.dest, SectorDest::HighestAdjacentCeiling);
        assert_eq!(data.speed, 2 * FIXED_ONE);
        assert_eq!(data.repetition, MoveRepetition::None);
    }

    #[test]
    fn test_lift_and_crusher_data() {
        let lift = LineSpecialType::PlatDownWaitUpStay
            .sector_move(&SpecialArgs([0, 32, 70, 0, 0]))
            .unwrap();
        assert_eq!(lift.face, SectorPlaneFace::Floor);
        assert_eq!(lift.repetition, MoveRepetition::DelayReturn { delay: 70 });
        assert_eq!(lift.speed, 4 * FIXED_ONE);

        let crusher = LineSpecialType::CeilingCrushAndRaise
            .sector_move(&SpecialArgs([3, 8, 0, 0, 0]))
            .unwrap();
        assert_eq!(crusher.crush, CrushMode::Damage(DEFAULT_CRUSH_DAMAGE));
        assert!(matches!(crusher.repetition, MoveRepetition::Perpetual { .. }));
    }

    #[test]
    fn test_own_plane_destinations_keep_face() {
        // Own floor and ceiling targets share variant names with the plane faces
        let args = SpecialArgs([1, 16, 0, 0, 0]);
        let close = LineSpecialType::DoorClose.sector_move(&args).unwrap();
        assert_eq!((close.face, close.dest), (SectorPlaneFace::Ceiling, SectorDest::Floor));

        let crush = LineSpecialType::CeilingLowerAndCrush.sector_move(&args).unwrap();
        assert_eq!((crush.face, crush.dest), (SectorPlaneFace::Ceiling, SectorDest::Floor));

        let floor = LineSpecialType::FloorRaiseToHighest.sector_move(&args).unwrap();
        assert_eq!((floor.face, floor.dest), (SectorPlaneFace::Floor, SectorDest::HighestAdjacentFloor));
    }

    #[test]
    fn test_teleport_does_not_move_sectors() {
        assert!(LineSpecialType::Teleport.sector_move(&SpecialArgs::default()).is_none());
        assert!(LineSpecialType::Teleport.is_teleport());
        assert!(LineSpecialType::None.is_none());
    }
}
