//! Line teleporters.

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::vec2::FixedVec3;
use crate::entity::{Behavior, EntityId};
use crate::geometry::LineId;
use crate::world::events::{WorldEvent, WorldEventData};
use super::{SpecialContext, SpecialTickStatus};

/// Sound played at both ends of a teleport with fog.
pub const TELEPORT_SOUND: &str = "misc/teleport";

/// Moves an entity to a teleport destination on its first tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeleportSpecial {
    /// Entity being teleported
    pub entity: EntityId,
    /// Line that triggered it
    pub line: LineId,
    /// Destination tid (0 = any destination)
    pub tid: i32,
    /// Destination sector tag (0 = any sector)
    pub sector_tag: i32,
    /// Play fog sounds
    pub fog: bool,
}

impl TeleportSpecial {
    /// Destination entity: the lowest id `TeleportDest` matching the tid
    /// and, when given, standing in a sector with the tag.
    fn find_destination(&self, ctx: &SpecialContext<'_>) -> Option<EntityId> {
        let entities = &*ctx.entities;
        let is_destination = |id: &EntityId| {
            let Some(entity) = entities.get(*id) else { return false };
            let Some(definition) = entities.definitions().get(entity.definition) else {
                return false;
            };
            definition.behavior == Behavior::TeleportDestination
                && (self.sector_tag == 0 || ctx.geometry.sectors[entity.sector].tag == self.sector_tag)
        };

        if self.tid != 0 {
            entities.find_by_tid(self.tid).filter(is_destination).min()
        } else {
            entities.iter().map(|e| e.id).filter(is_destination).min()
        }
    }

    /// Teleport the entity. Always finishes in one tick.
    pub fn tick(&mut self, ctx: &mut SpecialContext<'_>) -> SpecialTickStatus {
        let Some(destination) = self.find_destination(ctx) else {
            warn!(line = self.line, tid = self.tid, tag = self.sector_tag, "No teleport destination");
            return SpecialTickStatus::Destroy;
        };
        let Some((target, angle)) = ctx.entities.get(destination).map(|d| (d.position, d.angle)) else {
            return SpecialTickStatus::Destroy;
        };
        let Some(mut entity) = ctx.entities.get(self.entity).cloned() else {
            warn!(entity = %self.entity, "Teleported entity no longer exists");
            return SpecialTickStatus::Destroy;
        };

        let from = entity.position;
        let floor = ctx.geometry.sectors[ctx.geometry.sector_at(target.xy())].floor.z;
        let to = FixedVec3::new(target.x, target.y, floor);

        ctx.physics.unlink_entity(ctx.geometry, &entity);
        entity.position = to;
        entity.angle = angle;
        entity.velocity = FixedVec3::ZERO;
        ctx.physics.link_entity(ctx.geometry, ctx.entities, &mut entity);
        entity.reset_interpolation();
        ctx.entities.update(entity);

        if self.fog {
            ctx.events.push(WorldEvent::sound(ctx.gametick, TELEPORT_SOUND, from));
            ctx.events.push(WorldEvent::sound(ctx.gametick, TELEPORT_SOUND, to));
        }
        ctx.events.push(WorldEvent::new(
            ctx.gametick,
            WorldEventData::Teleported { entity: self.entity, from, to },
        ));
        debug!(entity = %self.entity, ?to, "Teleported");
        SpecialTickStatus::Destroy
    }
}
