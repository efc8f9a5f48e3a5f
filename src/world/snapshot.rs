//! World Snapshots
//!
//! Everything needed to resume a world on top of freshly built geometry:
//! changed lines and their sides, sector planes, entities, players, running
//! specials, the RNG and the tick counter. Link state (sector entity sets,
//! blockmap) is rebuilt on restore.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::info;

use crate::core::fixed::Fixed;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec2;
use crate::entity::{DefinitionRegistry, Entity, EntityId, EntityManager, Player};
use crate::geometry::{GeometryBuilder, LineId, MapGeometry, SideTextures};
use crate::map::MapData;
use crate::physics::PhysicsManager;
use crate::special::{Special, SpecialManager};
use super::{World, WorldConfig, WorldError};

/// Bumped whenever the encoded layout changes.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Largest entity id pool a snapshot may describe.
pub const MAX_ENTITY_IDS: u32 = 1 << 16;

/// Snapshot failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Written by an incompatible version.
    #[error("snapshot version {found}, expected {expected}")]
    Version {
        /// Version in the snapshot
        found: u32,
        /// Version this build writes
        expected: u32,
    },

    /// Taken on another map.
    #[error("snapshot of map {snapshot}, loading {map}")]
    MapMismatch {
        /// Map named in the snapshot
        snapshot: String,
        /// Map being restored onto
        map: String,
    },

    /// Sector count differs from the map.
    #[error("snapshot has {found} sectors, map has {expected}")]
    SectorCount {
        /// Sectors in the snapshot
        found: usize,
        /// Sectors in the map
        expected: usize,
    },

    /// A line or side index is out of range.
    #[error("snapshot line {0} does not exist")]
    UnknownLine(LineId),

    /// An entity id lies outside the recorded id pool.
    #[error("snapshot entity {id} outside id pool of {limit}")]
    EntityIdRange {
        /// Offending id
        id: EntityId,
        /// Recorded pool size
        limit: u32,
    },

    /// Two entities share an id.
    #[error("snapshot entity {0} appears twice")]
    DuplicateEntity(EntityId),
}

/// Runtime state of one side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSnapshot {
    /// Textures, including swapped switch textures
    pub textures: SideTextures,
    /// Texture offset
    pub offset: FixedVec2,
}

/// Runtime state of a line that changed during play.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    /// Line index
    pub id: LineId,
    /// Special already fired
    pub activated: bool,
    /// Runtime texture changes so far
    pub data_changes: u32,
    /// Front side, then back side if any
    pub sides: Vec<SideSnapshot>,
}

/// Sector planes and light.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorSnapshot {
    /// Floor height
    pub floor_z: Fixed,
    /// Ceiling height
    pub ceiling_z: Fixed,
    /// Light level
    pub light_level: i16,
}

/// A resumable world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Layout version
    pub version: u32,
    /// Map name
    pub map: String,
    /// Tick counter
    pub gametick: u32,
    /// Seed the world was started with
    pub seed: u64,
    /// RNG position
    pub rng: DeterministicRng,
    /// Lines that were activated or changed
    pub lines: Vec<LineSnapshot>,
    /// Every sector, in map order
    pub sectors: Vec<SectorSnapshot>,
    /// One past the highest entity id in use
    pub entity_ids: u32,
    /// Live entities in tick order
    pub entities: Vec<Entity>,
    /// Players
    pub players: Vec<Player>,
    /// Running specials
    pub specials: Vec<Special>,
}

impl WorldSnapshot {
    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode bytes written by [`WorldSnapshot::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version { found: snapshot.version, expected: SNAPSHOT_VERSION });
        }
        Ok(snapshot)
    }

    /// Entity ids must be unique and inside the recorded pool, which itself
    /// is capped at [`MAX_ENTITY_IDS`]. Checked before any slot is allocated.
    fn check_entity_ids(&self) -> Result<(), SnapshotError> {
        let limit = self.entity_ids.min(MAX_ENTITY_IDS);
        let mut seen = BTreeSet::new();
        for entity in &self.entities {
            if entity.id.0 >= limit {
                return Err(SnapshotError::EntityIdRange { id: entity.id, limit: self.entity_ids });
            }
            if !seen.insert(entity.id) {
                return Err(SnapshotError::DuplicateEntity(entity.id));
            }
        }
        Ok(())
    }

    fn apply_geometry(&self, geometry: &mut MapGeometry) -> Result<(), SnapshotError> {
        if self.map != geometry.name {
            return Err(SnapshotError::MapMismatch { snapshot: self.map.clone(), map: geometry.name.clone() });
        }
        if self.sectors.len() != geometry.sectors.len() {
            return Err(SnapshotError::SectorCount { found: self.sectors.len(), expected: geometry.sectors.len() });
        }

        for (sector, saved) in geometry.sectors.iter_mut().zip(&self.sectors) {
            sector.floor.z = saved.floor_z;
            sector.ceiling.z = saved.ceiling_z;
            sector.light_level = saved.light_level;
        }

        for saved in &self.lines {
            let line = geometry.lines.get_mut(saved.id).ok_or(SnapshotError::UnknownLine(saved.id))?;
            line.activated = saved.activated;
            line.data_changes = saved.data_changes;
            let sides: Vec<_> = line.sides().collect();
            if sides.len() != saved.sides.len() {
                return Err(SnapshotError::UnknownLine(saved.id));
            }
            for (side, saved_side) in sides.into_iter().zip(&saved.sides) {
                let side = &mut geometry.sides[side];
                side.textures = saved_side.textures.clone();
                side.offset = saved_side.offset;
            }
        }
        Ok(())
    }
}

impl World {
    /// Capture the resumable state.
    pub fn snapshot(&self) -> WorldSnapshot {
        let lines = self
            .geometry
            .lines
            .iter()
            .filter(|line| line.activated || line.data_changes > 0)
            .map(|line| LineSnapshot {
                id: line.id,
                activated: line.activated,
                data_changes: line.data_changes,
                sides: line
                    .sides()
                    .map(|side| {
                        let side = &self.geometry.sides[side];
                        SideSnapshot { textures: side.textures.clone(), offset: side.offset }
                    })
                    .collect(),
            })
            .collect();

        let sectors = self
            .geometry
            .sectors
            .iter()
            .map(|sector| SectorSnapshot {
                floor_z: sector.floor.z,
                ceiling_z: sector.ceiling.z,
                light_level: sector.light_level,
            })
            .collect();

        WorldSnapshot {
            version: SNAPSHOT_VERSION,
            map: self.geometry.name.clone(),
            gametick: self.gametick,
            seed: self.config.seed,
            rng: self.rng.clone(),
            lines,
            sectors,
            entity_ids: self.entities.id_high_water(),
            entities: self.entities.iter().cloned().collect(),
            players: self.entities.players().to_vec(),
            specials: self.specials.specials().to_vec(),
        }
    }

    /// Rebuild a world from its map and a snapshot taken on it.
    ///
    /// The map is not repopulated; the snapshot's entities replace it.
    pub fn restore(
        map: &MapData,
        definitions: DefinitionRegistry,
        config: WorldConfig,
        snapshot: WorldSnapshot,
    ) -> Result<Self, WorldError> {
        snapshot.check_entity_ids()?;
        let mut geometry = GeometryBuilder::build(map)?;
        snapshot.apply_geometry(&mut geometry)?;

        let mut physics = PhysicsManager::new(config.physics.clone(), &geometry);
        let mut entities = EntityManager::new(definitions, config.skill);
        for entity in snapshot.entities {
            let id = entity.id;
            entities.restore_entity(&mut geometry, &mut physics, entity);
            entities.add_spawn_location(id);
        }
        for player in snapshot.players {
            entities.restore_player(player);
        }

        let mut specials = SpecialManager::new();
        specials.restore(&mut geometry, snapshot.specials);

        info!(
            map = %geometry.name,
            gametick = snapshot.gametick,
            entities = entities.len(),
            specials = specials.len(),
            "Restored world"
        );

        Ok(Self {
            config: WorldConfig { seed: snapshot.seed, ..config },
            geometry,
            physics,
            entities,
            specials,
            rng: snapshot.rng,
            gametick: snapshot.gametick,
            pending_events: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angle::ANG180;
    use crate::entity::TickCommand;
    use crate::geometry::ActivationContext;
    use crate::map::demo;

    fn load() -> World {
        World::load(&demo::door_room(), DefinitionRegistry::doom_defaults(), WorldConfig::default()).unwrap()
    }

    fn restore(snapshot: WorldSnapshot) -> Result<World, WorldError> {
        World::restore(&demo::door_room(), DefinitionRegistry::doom_defaults(), WorldConfig::default(), snapshot)
    }

    /// A world mid-play: switch pressed, door moving, monsters awake.
    fn running() -> World {
        let mut world = load();
        world.set_command(
            0,
            TickCommand { angle_turn: ANG180 as i32, buttons: TickCommand::USE, ..TickCommand::default() },
        );
        for _ in 0..30 {
            world.tick();
        }
        world
    }

    #[test]
    fn test_snapshot_captures_changes() {
        let world = running();
        let snapshot = world.snapshot();

        assert_eq!(snapshot.gametick, 30);
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].id, demo::SWITCH_LINE);
        assert_eq!(snapshot.lines[0].sides[0].textures.middle, "SW2COMP");
        assert_eq!(snapshot.specials.len(), 1);
        assert_eq!(snapshot.entities.len(), world.entities().len());
        assert_eq!(snapshot.players.len(), 1);
    }

    #[test]
    fn test_restore_reproduces_hash_and_future() {
        let mut original = running();
        let bytes = original.snapshot().to_bytes().unwrap();
        let mut restored = restore(WorldSnapshot::from_bytes(&bytes).unwrap()).unwrap();

        assert_eq!(restored.compute_hash(), original.compute_hash());
        assert!(restored.geometry().sectors[demo::DOOR_SECTOR].is_moving);
        assert_eq!(restored.geometry().sides[0].textures.middle, "SW2COMP");

        for tick in 0..120 {
            let command = if tick % 2 == 0 { TickCommand::forward(40) } else { TickCommand::default() };
            original.set_command(0, command);
            restored.set_command(0, command);
            original.tick();
            restored.tick();
        }
        assert_eq!(restored.compute_hash(), original.compute_hash());
        assert_eq!(restored.take_events(), {
            let events = original.take_events();
            events.into_iter().filter(|e| e.tick >= 30).collect::<Vec<_>>()
        });
    }

    #[test]
    fn test_restore_keeps_line_state() {
        let mut original = running();
        let mut restored = restore(original.snapshot()).unwrap();
        let player = restored.players()[0].entity;

        // Non-repeatable switch stays spent after restore
        assert!(!restored.activate_line(demo::SWITCH_LINE, player, ActivationContext::UseLine));
        assert!(!original.activate_line(demo::SWITCH_LINE, player, ActivationContext::UseLine));
    }

    #[test]
    fn test_rejects_other_map() {
        let snapshot = running().snapshot();
        let result = World::restore(
            &demo::square_room(128, 0, 128),
            DefinitionRegistry::doom_defaults(),
            WorldConfig::default(),
            snapshot,
        );
        assert!(matches!(result, Err(WorldError::Snapshot(SnapshotError::MapMismatch { .. }))));
    }

    #[test]
    fn test_rejects_entity_ids_outside_pool() {
        let snapshot = running().snapshot();
        assert_eq!(snapshot.entity_ids, snapshot.entities.iter().map(|e| e.id.0 + 1).max().unwrap());

        let mut huge = snapshot.clone();
        huge.entities[0].id = EntityId(u32::MAX - 1);
        assert!(matches!(restore(huge), Err(WorldError::Snapshot(SnapshotError::EntityIdRange { .. }))));

        // A forged pool size does not lift the cap
        let mut forged = snapshot.clone();
        forged.entity_ids = u32::MAX;
        forged.entities[0].id = EntityId(MAX_ENTITY_IDS);
        assert!(matches!(restore(forged), Err(WorldError::Snapshot(SnapshotError::EntityIdRange { .. }))));

        let mut twice = snapshot;
        twice.entities[1].id = twice.entities[0].id;
        assert!(matches!(restore(twice), Err(WorldError::Snapshot(SnapshotError::DuplicateEntity(_)))));
    }

    #[test]
    fn test_rejects_other_version() {
        let mut snapshot = running().snapshot();
        snapshot.version = SNAPSHOT_VERSION + 1;
        let bytes = bincode::serialize(&snapshot).unwrap();
        assert!(matches!(WorldSnapshot::from_bytes(&bytes), Err(SnapshotError::Version { .. })));
        assert!(matches!(WorldSnapshot::from_bytes(&[1, 2, 3]), Err(SnapshotError::Codec(_))));
    }
}
