//! Special Manager
//!
//! Turns line activations into running specials and ticks them:
//!
//! ```text
//!   use / cross ──► add_activated_line_special
//!                      │ teleport ──► TeleportSpecial
//!                      │ mover    ──► SectorMoveSpecial per tagged sector
//!                      ▼
//!                 specials: Vec<Special> ──tick──► Continue | Destroy
//! ```
//!
//! A sector is flagged as moving for as long as a mover targets it, so at
//! most one mover runs per sector.

pub mod line_special;
pub mod sector_move;
pub mod teleport;

pub use line_special::{
    CrushMode, LineSpecialType, MoveRepetition, SectorDest, SectorMoveData, DEFAULT_CRUSH_DAMAGE,
};
pub use sector_move::SectorMoveSpecial;
pub use teleport::TeleportSpecial;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::Fixed;
use crate::entity::{EntityId, EntityManager};
use crate::geometry::{ActivationContext, LineId, MapGeometry, SectorId, SectorPlaneFace};
use crate::physics::PhysicsManager;
use crate::world::events::{WorldEvent, WorldEventData};

/// Switch sound.
pub const SWITCH_SOUND: &str = "switches/normbutn";

/// Result of ticking a special.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialTickStatus {
    /// Keep ticking
    Continue,
    /// Finished; remove it
    Destroy,
}

/// Everything a special may touch while ticking.
pub struct SpecialContext<'a> {
    /// Map geometry
    pub geometry: &'a mut MapGeometry,
    /// Live entities
    pub entities: &'a mut EntityManager,
    /// Physics, for plane moves and relinking
    pub physics: &'a mut PhysicsManager,
    /// Events produced this tick
    pub events: &'a mut Vec<WorldEvent>,
    /// Current tick
    pub gametick: u32,
}

/// A running special.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Special {
    /// Floor or ceiling mover
    SectorMove(SectorMoveSpecial),
    /// Teleporter
    Teleport(TeleportSpecial),
}

impl Special {
    /// Advance one tick.
    pub fn tick(&mut self, ctx: &mut SpecialContext<'_>) -> SpecialTickStatus {
        match self {
            Special::SectorMove(mover) => mover.tick(ctx),
            Special::Teleport(teleport) => teleport.tick(ctx),
        }
    }

    /// Sector this special holds, if any.
    pub fn sector(&self) -> Option<SectorId> {
        match self {
            Special::SectorMove(mover) => Some(mover.sector),
            Special::Teleport(_) => None,
        }
    }
}

/// A line being used or crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationArgs {
    /// Activated line
    pub line: LineId,
    /// Entity activating it
    pub activator: EntityId,
    /// How it was activated
    pub context: ActivationContext,
}

/// Owns and ticks every running special.
#[derive(Clone, Debug, Default)]
pub struct SpecialManager {
    specials: Vec<Special>,
    pending_events: Vec<WorldEvent>,
}

impl SpecialManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Running specials in creation order.
    pub fn specials(&self) -> &[Special] {
        &self.specials
    }

    /// Number of running specials.
    pub fn len(&self) -> usize {
        self.specials.len()
    }

    /// True if nothing is running.
    pub fn is_empty(&self) -> bool {
        self.specials.is_empty()
    }

    /// Put back specials from a snapshot. Their sectors are flagged moving.
    pub fn restore(&mut self, geometry: &mut MapGeometry, specials: Vec<Special>) {
        for sector in specials.iter().filter_map(Special::sector) {
            if let Some(sector) = geometry.sectors.get_mut(sector) {
                sector.is_moving = true;
            }
        }
        self.specials = specials;
    }

    /// Events produced since the last call.
    pub fn take_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Start the special of a used or crossed line.
    ///
    /// Returns true iff at least one special was created, in which case the
    /// line is marked activated.
    pub fn add_activated_line_special(
        &mut self,
        geometry: &mut MapGeometry,
        entities: &EntityManager,
        gametick: u32,
        args: ActivationArgs,
    ) -> bool {
        let Some(line) = geometry.lines.get(args.line) else {
            return false;
        };
        if !line.has_special() || (line.activated && !line.is_repeatable()) {
            return false;
        }
        let Some(activator) = entities.get(args.activator) else {
            return false;
        };
        if !line.can_activate(args.context, activator.is_player()) {
            return false;
        }

        let special = line.special;
        let line_args = line.args;
        let position = activator.position;

        let created = if special.is_teleport() {
            self.specials.push(Special::Teleport(TeleportSpecial {
                entity: args.activator,
                line: args.line,
                tid: line_args.arg(0),
                sector_tag: line_args.arg(1),
                fog: special == LineSpecialType::Teleport,
            }));
            true
        } else if let Some(data) = special.sector_move(&line_args) {
            self.add_sector_moves(geometry, args, special, data)
        } else {
            false
        };

        if !created {
            return false;
        }

        let line = &mut geometry.lines[args.line];
        line.activated = true;
        if args.context == ActivationContext::UseLine {
            let front = line.front;
            if geometry.sides[front].textures.toggle_switch() {
                geometry.lines[args.line].data_changes += 1;
                self.pending_events.push(WorldEvent::sound(gametick, SWITCH_SOUND, position));
            }
        }
        self.pending_events.push(WorldEvent::new(
            gametick,
            WorldEventData::LineActivated { line: args.line, activator: args.activator, special },
        ));
        debug!(line = args.line, activator = %args.activator, ?special, "Activated line special");
        true
    }

    fn add_sector_moves(
        &mut self,
        geometry: &mut MapGeometry,
        args: ActivationArgs,
        special: LineSpecialType,
        data: SectorMoveData,
    ) -> bool {
        if data.speed <= 0 {
            return false;
        }

        let line = &geometry.lines[args.line];
        let tag = line.args.sector_tag();
        let sectors: Vec<SectorId> = if tag != 0 {
            geometry.sectors_with_tag(tag).collect()
        } else {
            geometry.back_sector(line).into_iter().collect()
        };
        let toggles = special.is_door() && line.is_repeatable();

        let mut created = false;
        for sector in sectors {
            if geometry.sectors[sector].is_moving {
                // Using a door while it waits open sends it back down, but
                // no special is created
                if toggles && args.context == ActivationContext::UseLine {
                    self.return_waiting_mover(sector);
                }
                continue;
            }

            let start_z = geometry.sectors[sector].plane(data.face).z;
            let dest_z = destination_z(geometry, sector, data.face, data.dest);
            let mover = if toggles && start_z == dest_z {
                SectorMoveSpecial::new(
                    sector,
                    data.face,
                    start_z,
                    geometry.sectors[sector].floor.z,
                    data.speed,
                    MoveRepetition::None,
                    CrushMode::None,
                )
            } else {
                SectorMoveSpecial::new(sector, data.face, start_z, dest_z, data.speed, data.repetition, data.crush)
            };

            geometry.sectors[sector].is_moving = true;
            self.specials.push(Special::SectorMove(mover));
            created = true;
        }
        created
    }

    fn return_waiting_mover(&mut self, sector: SectorId) {
        let waiting = self.specials.iter_mut().find_map(|special| match special {
            Special::SectorMove(mover) if mover.sector == sector && mover.is_waiting_at_dest() => Some(mover),
            _ => None,
        });
        if let Some(mover) = waiting {
            mover.return_now();
        }
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Advance every special in order, dropping finished ones and releasing
    /// their sectors.
    pub fn tick(
        &mut self,
        geometry: &mut MapGeometry,
        entities: &mut EntityManager,
        physics: &mut PhysicsManager,
        gametick: u32,
    ) {
        let mut released = Vec::new();
        let mut ctx = SpecialContext {
            geometry,
            entities,
            physics,
            events: &mut self.pending_events,
            gametick,
        };

        self.specials.retain_mut(|special| match special.tick(&mut ctx) {
            SpecialTickStatus::Continue => true,
            SpecialTickStatus::Destroy => {
                released.extend(special.sector());
                false
            }
        });

        for sector in released {
            if let Some(s) = ctx.geometry.sectors.get_mut(sector) {
                s.is_moving = false;
            }
            ctx.events.push(WorldEvent::new(gametick, WorldEventData::SectorMoveFinished { sector }));
        }
    }
}

/// Height a mover heads to. Adjacency queries without a neighbour fall back
/// to the sector's own height of the moved plane.
pub fn destination_z(geometry: &MapGeometry, sector: SectorId, face: SectorPlaneFace, dest: SectorDest) -> Fixed {
    let own = &geometry.sectors[sector];
    let fallback = own.plane(face).z;
    match dest {
        SectorDest::LowestAdjacentFloor => geometry.lowest_adjacent_floor(sector).map_or(fallback, |s| s.floor.z),
        SectorDest::HighestAdjacentFloor => geometry.highest_adjacent_floor(sector).map_or(fallback, |s| s.floor.z),
        SectorDest::LowestAdjacentCeiling => {
            geometry.lowest_adjacent_ceiling(sector).map_or(fallback, |s| s.ceiling.z)
        }
        SectorDest::HighestAdjacentCeiling => {
            geometry.highest_adjacent_ceiling(sector).map_or(fallback, |s| s.ceiling.z)
        }
        SectorDest::Floor => own.floor.z,
        SectorDest::Ceiling => own.ceiling.z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angle::Angle;
    use crate::core::fixed::from_int;
    use crate::core::vec2::FixedVec3;
    use crate::entity::DefinitionRegistry;
    use crate::geometry::GeometryBuilder;
    use crate::map::demo;
    use crate::world::config::{PhysicsConfig, SkillLevel};

    struct Fixture {
        geometry: MapGeometry,
        physics: PhysicsManager,
        entities: EntityManager,
        specials: SpecialManager,
        gametick: u32,
    }

    impl Fixture {
        fn new() -> Self {
            let map = demo::door_room();
            let mut geometry = GeometryBuilder::build(&map).unwrap();
            let mut physics = PhysicsManager::new(PhysicsConfig::default(), &geometry);
            let mut entities = EntityManager::new(DefinitionRegistry::doom_defaults(), SkillLevel::Medium);
            entities.populate_from(&mut geometry, &mut physics, &map);
            Self { geometry, physics, entities, specials: SpecialManager::new(), gametick: 0 }
        }

        fn player(&mut self, x: i32, y: i32, angle: Angle) -> EntityId {
            let id = self.entities.create_player(&mut self.geometry, &mut self.physics, 0).unwrap();
            let mut body = self.entities.get(id).cloned().unwrap();
            self.physics.unlink_entity(&mut self.geometry, &body);
            body.position = FixedVec3::from_ints(x, y, 0);
            body.angle = angle;
            self.physics.link_entity(&mut self.geometry, &self.entities, &mut body);
            self.entities.update(body);
            id
        }

        fn activate(&mut self, line: LineId, activator: EntityId) -> bool {
            let args = ActivationArgs { line, activator, context: ActivationContext::UseLine };
            self.specials.add_activated_line_special(&mut self.geometry, &self.entities, self.gametick, args)
        }

        fn tick(&mut self) {
            self.specials.tick(&mut self.geometry, &mut self.entities, &mut self.physics, self.gametick);
            self.gametick += 1;
        }

        fn door_ceiling(&self) -> Fixed {
            self.geometry.sectors[demo::DOOR_SECTOR].ceiling.z
        }
    }

    #[test]
    fn test_switch_opens_tagged_door() {
        let mut f = Fixture::new();
        let player = f.player(32, 128, Angle::WEST);

        assert!(f.activate(demo::SWITCH_LINE, player));
        assert!(f.geometry.lines[demo::SWITCH_LINE].activated);
        assert!(f.geometry.sectors[demo::DOOR_SECTOR].is_moving);
        assert_eq!(f.geometry.sides[f.geometry.lines[demo::SWITCH_LINE].front].textures.middle, "SW2COMP");
        assert_eq!(f.geometry.lines[demo::SWITCH_LINE].data_changes, 1);

        // Not repeatable
        assert!(!f.activate(demo::SWITCH_LINE, player));

        // Speed 16 is two units per tick; room B's ceiling is the highest around
        for _ in 0..79 {
            f.tick();
        }
        assert_eq!(f.door_ceiling(), from_int(158));
        assert_eq!(f.specials.len(), 1);
        f.tick();
        assert_eq!(f.door_ceiling(), from_int(160));
        assert!(f.specials.is_empty());
        assert!(!f.geometry.sectors[demo::DOOR_SECTOR].is_moving);

        let events = f.specials.take_events();
        assert!(events.iter().any(|e| e.sound_name() == Some(SWITCH_SOUND)));
        assert!(events
            .iter()
            .any(|e| e.data == WorldEventData::SectorMoveFinished { sector: demo::DOOR_SECTOR }));
    }

    #[test]
    fn test_door_raise_waits_and_closes() {
        let mut f = Fixture::new();
        let player = f.player(210, 128, Angle::EAST);
        assert!(f.activate(demo::DOOR_LINE_A, player));

        for _ in 0..80 {
            f.tick();
        }
        assert_eq!(f.door_ceiling(), from_int(160));

        // A second mover is refused while the first holds the sector; using
        // the door while it waits sends it back without creating anything
        assert_eq!(f.specials.len(), 1);
        f.specials.take_events();
        assert!(!f.activate(demo::DOOR_LINE_A, player));
        assert_eq!(f.specials.len(), 1);
        assert!(f.specials.take_events().is_empty());
        for _ in 0..80 {
            f.tick();
        }
        assert_eq!(f.door_ceiling(), 0);
        assert!(f.specials.is_empty());
    }

    #[test]
    fn test_one_mover_per_sector() {
        let mut f = Fixture::new();
        let player = f.player(210, 128, Angle::EAST);

        // Tagged switch and both untagged door faces reach the same sector
        assert!(f.activate(demo::SWITCH_LINE, player));
        assert!(!f.activate(demo::DOOR_LINE_A, player));
        assert!(!f.activate(demo::DOOR_LINE_B, player));

        assert_eq!(f.specials.len(), 1);
        assert!(!f.geometry.lines[demo::DOOR_LINE_A].activated);
        assert!(!f.geometry.lines[demo::DOOR_LINE_B].activated);
        assert!(f.geometry.sectors[demo::DOOR_SECTOR].is_moving);
    }

    #[test]
    fn test_open_door_toggles_closed() {
        let mut f = Fixture::new();
        let player = f.player(210, 128, Angle::EAST);
        f.geometry.lines[demo::DOOR_LINE_A].special = LineSpecialType::DoorOpen;

        assert!(f.activate(demo::DOOR_LINE_A, player));
        for _ in 0..80 {
            f.tick();
        }
        assert_eq!(f.door_ceiling(), from_int(160));
        assert!(f.specials.is_empty());

        // Already at its destination, so the door closes to the floor
        assert!(f.activate(demo::DOOR_LINE_A, player));
        assert_eq!(f.specials.len(), 1);
        for _ in 0..79 {
            f.tick();
        }
        assert_eq!(f.door_ceiling(), from_int(2));
        f.tick();
        assert_eq!(f.door_ceiling(), 0);
        assert!(f.specials.is_empty());
        assert!(!f.geometry.sectors[demo::DOOR_SECTOR].is_moving);
    }

    #[test]
    fn test_door_raise_full_cycle() {
        let mut f = Fixture::new();
        let player = f.player(210, 128, Angle::EAST);
        assert!(f.activate(demo::DOOR_LINE_A, player));
        // 80 up, 150 waiting, 80 down
        for _ in 0..310 {
            f.tick();
        }
        assert_eq!(f.door_ceiling(), 0);
        assert!(f.specials.is_empty());
    }

    #[test]
    fn test_closing_door_bounces_off_player() {
        let mut f = Fixture::new();
        let player = f.player(210, 128, Angle::EAST);
        assert!(f.activate(demo::DOOR_LINE_A, player));
        for _ in 0..80 {
            f.tick();
        }

        // Step into the doorway while the door waits
        let mut body = f.entities.get(player).cloned().unwrap();
        f.physics.unlink_entity(&mut f.geometry, &body);
        body.position = FixedVec3::from_ints(264, 128, 0);
        f.physics.link_entity(&mut f.geometry, &f.entities, &mut body);
        f.entities.update(body);

        // 150 ticks waiting, 52 down to head height, then it bounces back up
        for _ in 0..230 {
            f.tick();
        }
        assert_eq!(f.door_ceiling(), from_int(110));
        assert_eq!(f.specials.len(), 1);
    }

    #[test]
    fn test_lift_lowers_and_returns() {
        let mut f = Fixture::new();
        let player = f.player(500, 96, Angle::WEST);
        assert!(f.activate(demo::LIFT_LINE, player));

        // 24 units at 4 per tick
        for _ in 0..6 {
            f.tick();
        }
        assert_eq!(f.geometry.sectors[demo::LIFT_SECTOR].floor.z, 0);

        for _ in 0..(70 + 6) {
            f.tick();
        }
        assert_eq!(f.geometry.sectors[demo::LIFT_SECTOR].floor.z, from_int(24));
        assert!(f.specials.is_empty());
    }

    #[test]
    fn test_teleport_moves_activator() {
        let mut f = Fixture::new();
        let player = f.player(510, 30, Angle::EAST);
        assert!(f.activate(demo::TELEPORT_LINE, player));
        f.tick();

        let body = f.entities.get(player).unwrap();
        assert_eq!(body.position, FixedVec3::from_ints(128, 200, 0));
        assert_eq!(body.angle, Angle::from_degrees(270));
        assert_eq!(body.sector, demo::ROOM_A);
        assert_eq!(body.prev_position, body.position);
        assert!(f.geometry.sectors[demo::ROOM_A].entities.contains(&player));
        assert!(!f.geometry.sectors[demo::ROOM_B].entities.contains(&player));
        assert!(f.specials.is_empty());

        // Repeatable
        assert!(f.activate(demo::TELEPORT_LINE, player));
    }

    #[test]
    fn test_lines_without_specials_are_ignored() {
        let mut f = Fixture::new();
        let player = f.player(32, 128, Angle::WEST);
        assert!(!f.activate(1, player));
        assert!(!f.geometry.lines[1].activated);
    }

    #[test]
    fn test_destination_fallback_to_own_height() {
        let geometry = GeometryBuilder::build(&demo::square_room(128, 8, 96)).unwrap();
        let z = destination_z(&geometry, 0, SectorPlaneFace::Floor, SectorDest::LowestAdjacentFloor);
        assert_eq!(z, from_int(8));
        let z = destination_z(&geometry, 0, SectorPlaneFace::Ceiling, SectorDest::HighestAdjacentCeiling);
        assert_eq!(z, from_int(96));
    }
}
