//! Sectors and their planes.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::entity::EntityId;
use super::{LineId, SectorId, SideId};

/// Which of a sector's two planes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectorPlaneFace {
    /// The floor
    Floor,
    /// The ceiling
    Ceiling,
}

/// A horizontal plane bounding a sector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorPlane {
    /// Height of the plane
    pub z: Fixed,
    /// Flat texture name
    pub texture: String,
}

impl SectorPlane {
    /// Create a plane.
    pub fn new(z: Fixed, texture: impl Into<String>) -> Self {
        Self { z, texture: texture.into() }
    }
}

/// A region of the map sharing one floor/ceiling pair and light level.
#[derive(Clone, Debug)]
pub struct Sector {
    /// Index in the sector arena
    pub id: SectorId,
    /// Floor plane
    pub floor: SectorPlane,
    /// Ceiling plane
    pub ceiling: SectorPlane,
    /// Light level (0-255)
    pub light_level: i16,
    /// Tag targeted by line specials
    pub tag: i32,
    /// Sector special number, carried for renderers and future effects
    pub special: i32,
    /// True while a sector mover drives one of the planes
    pub is_moving: bool,
    /// Lines bounding this sector, in map order
    pub lines: Vec<LineId>,
    /// Sides facing into this sector, in map order
    pub sides: Vec<SideId>,
    /// Entities whose center currently lies inside this sector
    pub entities: BTreeSet<EntityId>,
}

impl Sector {
    /// The requested plane.
    pub fn plane(&self, face: SectorPlaneFace) -> &SectorPlane {
        match face {
            SectorPlaneFace::Floor => &self.floor,
            SectorPlaneFace::Ceiling => &self.ceiling,
        }
    }

    /// The requested plane, mutably.
    pub fn plane_mut(&mut self, face: SectorPlaneFace) -> &mut SectorPlane {
        match face {
            SectorPlaneFace::Floor => &mut self.floor,
            SectorPlaneFace::Ceiling => &mut self.ceiling,
        }
    }

    /// Vertical space between floor and ceiling.
    #[inline]
    pub fn opening_height(&self) -> Fixed {
        self.ceiling.z.saturating_sub(self.floor.z)
    }
}
