//! World Events
//!
//! Things that happened during a tick, drained by renderers and audio.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec3;
use crate::entity::EntityId;
use crate::geometry::{LineId, SectorId};
use crate::special::LineSpecialType;

/// Event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEventData {
    /// A sound should play
    Sound {
        sound: String,
        position: FixedVec3,
    },

    /// A line special started
    LineActivated {
        line: LineId,
        activator: EntityId,
        special: LineSpecialType,
    },

    /// A sector mover finished and released its sector
    SectorMoveFinished {
        sector: SectorId,
    },

    /// An entity was teleported
    Teleported {
        entity: EntityId,
        from: FixedVec3,
        to: FixedVec3,
    },

    /// A moving plane is crushing an entity
    Crush {
        entity: EntityId,
        damage: i32,
    },

    /// An entity took damage and survived
    EntityDamaged {
        entity: EntityId,
        amount: i32,
        health: i32,
    },

    /// An entity died
    EntityDied {
        entity: EntityId,
    },

    /// A player picked something up
    ItemPickedUp {
        player: usize,
        item: String,
    },
}

/// An event with the tick it happened on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Event data
    pub data: WorldEventData,
}

impl WorldEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: WorldEventData) -> Self {
        Self { tick, data }
    }

    /// Create a sound event.
    pub fn sound(tick: u32, sound: impl Into<String>, position: FixedVec3) -> Self {
        Self::new(tick, WorldEventData::Sound { sound: sound.into(), position })
    }

    /// Create a crush request.
    pub fn crush(tick: u32, entity: EntityId, damage: i32) -> Self {
        Self::new(tick, WorldEventData::Crush { entity, damage })
    }

    /// Sound name, for sound events.
    pub fn sound_name(&self) -> Option<&str> {
        match &self.data {
            WorldEventData::Sound { sound, .. } => Some(sound),
            _ => None,
        }
    }
}
