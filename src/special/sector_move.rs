//! Sector movers: doors, lifts, floors and crushers.

use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::core::fixed::{fixed_approach, Fixed};
use crate::geometry::{SectorId, SectorPlaneFace};
use crate::physics::MoveStatus;
use crate::world::events::WorldEvent;
use super::line_special::{CrushMode, MoveRepetition};
use super::{SpecialContext, SpecialTickStatus};

/// Ticks between two rounds of crush damage.
pub const CRUSH_INTERVAL: u32 = 4;

/// Moves one plane of one sector between a start and a destination height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorMoveSpecial {
    /// Moved sector
    pub sector: SectorId,
    /// Moved plane
    pub face: SectorPlaneFace,
    /// Height when the mover started
    pub start_z: Fixed,
    /// Height to reach
    pub dest_z: Fixed,
    /// Units per tick
    pub speed: Fixed,
    /// What to do on arrival
    pub repetition: MoveRepetition,
    /// What to do when something does not fit
    pub crush: CrushMode,
    heading_to_dest: bool,
    wait: u32,
}

impl SectorMoveSpecial {
    /// Mover starting at the plane's current height.
    pub fn new(
        sector: SectorId,
        face: SectorPlaneFace,
        start_z: Fixed,
        dest_z: Fixed,
        speed: Fixed,
        repetition: MoveRepetition,
        crush: CrushMode,
    ) -> Self {
        Self {
            sector,
            face,
            start_z,
            dest_z,
            speed,
            repetition,
            crush,
            heading_to_dest: true,
            wait: 0,
        }
    }

    /// Height currently being moved to.
    pub fn target_z(&self) -> Fixed {
        if self.heading_to_dest { self.dest_z } else { self.start_z }
    }

    /// Whether the mover sits at its destination waiting to go back.
    pub fn is_waiting_at_dest(&self) -> bool {
        self.wait > 0 && !self.heading_to_dest
    }

    /// Skip the rest of the wait and head back now.
    pub fn return_now(&mut self) {
        self.wait = 0;
        self.heading_to_dest = false;
    }

    /// Advance one tick.
    pub fn tick(&mut self, ctx: &mut SpecialContext<'_>) -> SpecialTickStatus {
        if self.wait > 0 {
            self.wait -= 1;
            return SpecialTickStatus::Continue;
        }

        let Some(current) = ctx.geometry.sectors.get(self.sector).map(|s| s.plane(self.face).z) else {
            warn!(sector = self.sector, "Sector mover lost its sector");
            return SpecialTickStatus::Destroy;
        };

        let target = self.target_z();
        let next = fixed_approach(current, target, self.speed);
        let crush = matches!(self.crush, CrushMode::Damage(_));
        let status = ctx.physics.move_sector_plane(
            ctx.geometry,
            ctx.entities,
            self.sector,
            self.face,
            next,
            crush,
        );

        match status {
            MoveStatus::Success if next == target => self.arrive(),
            MoveStatus::Success => SpecialTickStatus::Continue,
            MoveStatus::Blocked => {
                if self.crush == CrushMode::None {
                    self.heading_to_dest = !self.heading_to_dest;
                }
                SpecialTickStatus::Continue
            }
            MoveStatus::Crushed(victims) => {
                if let CrushMode::Damage(damage) = self.crush {
                    if ctx.gametick % CRUSH_INTERVAL == 0 {
                        for entity in victims {
                            ctx.events.push(WorldEvent::crush(ctx.gametick, entity, damage));
                        }
                    }
                }
                SpecialTickStatus::Continue
            }
        }
    }

    fn arrive(&mut self) -> SpecialTickStatus {
        match (self.heading_to_dest, self.repetition) {
            (true, MoveRepetition::None) => SpecialTickStatus::Destroy,
            (true, MoveRepetition::DelayReturn { delay } | MoveRepetition::Perpetual { delay }) => {
                self.heading_to_dest = false;
                self.wait = delay;
                SpecialTickStatus::Continue
            }
            (false, MoveRepetition::Perpetual { delay }) => {
                self.heading_to_dest = true;
                self.wait = delay;
                SpecialTickStatus::Continue
            }
            (false, _) => SpecialTickStatus::Destroy,
        }
    }
}
