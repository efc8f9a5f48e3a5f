//! Entity Manager
//!
//! Live entities (players, monsters, projectiles, items, markers), the
//! registry of their definitions, and the bookkeeping around them:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                 EntityManager                 │
//! │  slots[id] ── Entity        list (tick order) │
//! │  ids (dense pool)           tid → {EntityId}  │
//! │  spawn locations            players           │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Linking an entity into its sector and the blockmap is the physics layer's
//! job; the manager calls it when creating and destroying entities.

pub mod definition;
pub mod index_tracker;
pub mod inventory;
pub mod list;
pub mod manager;
pub mod player;
pub mod spawn;

pub use definition::{
    Behavior, DefinitionId, DefinitionRegistry, EntityDefinition, EntityFlags, ItemKind, ItemProps,
    PowerupType, PLAYER_CLASS,
};
pub use index_tracker::AvailableIndexTracker;
pub use inventory::{Inventory, InventoryItem};
pub use list::EntityList;
pub use manager::{DamageOutcome, EntityError, EntityManager, SpawnRequest, Z_HINT_UNSET};
pub use player::{Camera, Player, TickCommand};
pub use spawn::SpawnLocations;

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::angle::Angle;
use crate::core::bbox::BoundingBox;
use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::core::vec2::FixedVec3;
use crate::geometry::SectorId;

/// Dense, recycled entity id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coarse life cycle of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActorState {
    /// Just spawned, idle
    #[default]
    Spawn,
    /// Awake and acting
    Active,
    /// Playing its death
    Dying,
    /// Corpse
    Dead,
}

/// A live object in the world.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Id
    pub id: EntityId,
    /// Thing id from the map (0 = none)
    pub tid: i32,
    /// Definition
    pub definition: DefinitionId,
    /// Feet position
    pub position: FixedVec3,
    /// Position at the start of the last tick
    pub prev_position: FixedVec3,
    /// Velocity per tick
    pub velocity: FixedVec3,
    /// Facing
    pub angle: Angle,
    /// Sector containing the center
    pub sector: SectorId,
    /// Collision radius
    pub radius: Fixed,
    /// Height
    pub height: Fixed,
    /// Floor under the body, including raised edges and bridges
    pub floor_z: Fixed,
    /// Ceiling over the body
    pub ceiling_z: Fixed,
    /// Runtime flags (copied from the definition, then mutated)
    pub flags: EntityFlags,
    /// Health
    pub health: i32,
    /// Life cycle state
    pub state: ActorState,
    /// Ticks left in the current state (0 = indefinitely)
    pub state_tics: u32,
    /// Standing on the floor
    pub on_ground: bool,
    /// Ticks until a wandering monster picks a new direction
    pub move_count: u32,
    /// Entity that fired this projectile
    pub owner: Option<EntityId>,
    /// Owning player number
    pub player: Option<usize>,
}

impl Entity {
    /// Create an unlinked entity from its definition.
    pub fn new(
        id: EntityId,
        definition_id: DefinitionId,
        definition: &EntityDefinition,
        position: FixedVec3,
        angle: Angle,
        tid: i32,
    ) -> Self {
        Self {
            id,
            tid,
            definition: definition_id,
            position,
            prev_position: position,
            velocity: FixedVec3::ZERO,
            angle,
            sector: 0,
            radius: definition.radius.saturating_mul(FIXED_ONE),
            height: definition.height.saturating_mul(FIXED_ONE),
            floor_z: position.z,
            ceiling_z: position.z,
            flags: definition.flags,
            health: definition.health,
            state: ActorState::Spawn,
            state_tics: 0,
            on_ground: false,
            move_count: 0,
            owner: None,
            player: None,
        }
    }

    /// Position between the previous and current tick.
    pub fn interpolated_position(&self, fraction: Fixed) -> FixedVec3 {
        self.prev_position.lerp(self.position, fraction)
    }

    /// Forget the previous position (after teleports and spawning).
    pub fn reset_interpolation(&mut self) {
        self.prev_position = self.position;
    }

    /// Enter the spawn state of `definition`.
    pub fn set_spawn_state(&mut self, definition: &EntityDefinition) {
        self.state = ActorState::Spawn;
        self.state_tics = definition.spawn_tics;
    }

    /// XY bounds of the body.
    #[inline]
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::around(self.position.xy(), self.radius)
    }

    /// Z of the top of the body.
    #[inline]
    pub fn top(&self) -> Fixed {
        self.position.z.saturating_add(self.height)
    }

    /// True for player bodies.
    #[inline]
    pub fn is_player(&self) -> bool {
        self.player.is_some() || self.flags.player
    }

    /// True for monsters.
    #[inline]
    pub fn is_monster(&self) -> bool {
        self.flags.monster
    }

    /// True for projectiles.
    #[inline]
    pub fn is_missile(&self) -> bool {
        self.flags.missile
    }

    /// Neither dying nor dead.
    #[inline]
    pub fn is_alive(&self) -> bool {
        matches!(self.state, ActorState::Spawn | ActorState::Active)
    }

    /// Whether this body stops a sector plane from moving through it.
    #[inline]
    pub fn blocks_sector_move(&self) -> bool {
        self.is_alive() && self.flags.solid && self.flags.shootable
    }
}
