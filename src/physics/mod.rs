//! Physics / Movement Manager
//!
//! Moves entities through the map one tick at a time:
//!
//! ```text
//!   prev = position
//!        │
//!   gravity ─► Z integrate ─► clamp to floor / ceiling
//!        │
//!   XY: full move ──fits──► commit (relink, crossed lines, touches)
//!        │ blocked
//!        ▼
//!   bisect, stop short ─► slide along the blocking line (≤ 3 times)
//!        │ not a line
//!        ▼
//!   X only, then Y only
//!        │
//!   step up ─► friction
//! ```
//!
//! Also owns the blockmap and moves sector planes on behalf of the special
//! manager, testing and carrying the entities they touch.

pub mod blockmap;

pub use blockmap::{Blockmap, BLOCK_SIZE};

use std::collections::BTreeSet;

use crate::core::bbox::BoundingBox;
use crate::core::fixed::{fixed_abs, fixed_mul, Fixed, FIXED_ONE};
use crate::core::vec2::{FixedVec2, FixedVec3};
use crate::entity::{Entity, EntityId, EntityManager};
use crate::geometry::{LineId, MapGeometry, SectorId, SectorPlaneFace};
use crate::world::config::PhysicsConfig;

/// What stopped a move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blocker {
    /// A line the mover may not pass
    Line(LineId),
    /// A solid entity in the way
    Entity(EntityId),
    /// The floor/ceiling window does not fit, optionally because of the
    /// two-sided line that shaped it
    Height(Option<LineId>),
}

impl Blocker {
    /// Line to slide along, if any.
    pub fn line(&self) -> Option<LineId> {
        match *self {
            Blocker::Line(line) | Blocker::Height(Some(line)) => Some(line),
            _ => None,
        }
    }
}

/// Result of [`PhysicsManager::check_position`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionCheck {
    /// Sector containing the target
    pub sector: SectorId,
    /// Highest floor under the box
    pub floor_z: Fixed,
    /// Lowest ceiling over the box
    pub ceiling_z: Fixed,
    /// Lowest floor under the box
    pub dropoff_z: Fixed,
    /// First reason the target is rejected
    pub blocker: Option<Blocker>,
    /// Pickups the box overlaps
    pub touches: Vec<EntityId>,
}

impl PositionCheck {
    /// Whether the entity may stand at the target.
    #[inline]
    pub fn fits(&self) -> bool {
        self.blocker.is_none()
    }
}

/// What happened to an entity during [`PhysicsManager::tick_entity`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveResult {
    /// Special lines whose side the entity's center changed, in id order
    pub crossed: Vec<LineId>,
    /// Pickups touched, in id order
    pub touches: Vec<EntityId>,
    /// Last obstruction met
    pub blocked: Option<Blocker>,
    /// Ran into the floor or the ceiling this tick
    pub hit_plane: bool,
    /// Height climbed by stepping up
    pub step_up: Fixed,
}

/// Result of [`PhysicsManager::move_sector_plane`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveStatus {
    /// The plane reached the requested height
    Success,
    /// Something did not fit; the plane stayed put
    Blocked,
    /// Something did not fit and crushing was requested; the plane stayed
    /// put and these entities should take crush damage
    Crushed(Vec<EntityId>),
}

/// Movement and collision for every entity, plus sector plane moves.
#[derive(Clone, Debug)]
pub struct PhysicsManager {
    config: PhysicsConfig,
    blockmap: Blockmap,
}

impl PhysicsManager {
    /// Create the manager and the blockmap for `geometry`.
    pub fn new(config: PhysicsConfig, geometry: &MapGeometry) -> Self {
        Self {
            config,
            blockmap: Blockmap::new(geometry),
        }
    }

    /// Tunables.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// The blockmap.
    pub fn blockmap(&self) -> &Blockmap {
        &self.blockmap
    }

    // =========================================================================
    // Linking
    // =========================================================================

    /// Link into the containing sector and the blockmap, and compute the
    /// floor/ceiling window at the current position.
    pub fn link_entity(&mut self, geometry: &mut MapGeometry, entities: &EntityManager, entity: &mut Entity) {
        let check = self.check_position(geometry, entities, entity, entity.position);
        entity.sector = check.sector;
        entity.floor_z = check.floor_z;
        entity.ceiling_z = check.ceiling_z;
        entity.on_ground = entity.position.z <= entity.floor_z;

        geometry.sectors[check.sector].entities.insert(entity.id);
        if !entity.flags.no_blockmap {
            self.blockmap.link(entity.id, &entity.bbox());
        }
    }

    /// Remove from the sector and the blockmap.
    pub fn unlink_entity(&mut self, geometry: &mut MapGeometry, entity: &Entity) {
        if let Some(sector) = geometry.sectors.get_mut(entity.sector) {
            sector.entities.remove(&entity.id);
        }
        self.blockmap.unlink(entity.id);
    }

    // =========================================================================
    // Position checks
    // =========================================================================

    /// Test whether `entity` may stand at `target`.
    ///
    /// The window starts from the target sector and is narrowed by every
    /// two-sided line the box crosses and by solid entities overlapping it:
    /// those entirely below (and bridges within step height) raise the floor,
    /// those entirely above lower the ceiling. The window is always computed
    /// in full; `blocker` records the first rejection.
    pub fn check_position(
        &self,
        geometry: &MapGeometry,
        entities: &EntityManager,
        entity: &Entity,
        target: FixedVec3,
    ) -> PositionCheck {
        let center = target.xy();
        let bbox = BoundingBox::around(center, entity.radius);
        let sector = geometry.sector_at(center);
        let mut check = PositionCheck {
            sector,
            floor_z: geometry.sectors[sector].floor.z,
            ceiling_z: geometry.sectors[sector].ceiling.z,
            dropoff_z: geometry.sectors[sector].floor.z,
            blocker: None,
            touches: Vec::new(),
        };
        let mut floor_line = None;
        let mut ceiling_line = None;

        for line_id in self.blockmap.lines_in(&bbox) {
            let line = &geometry.lines[line_id];
            if !line.bbox.intersects(&bbox) || !box_crosses_line(&bbox, line.start, line.delta()) {
                continue;
            }
            if line.blocks_entity(entity.is_player(), entity.is_monster()) {
                check.blocker.get_or_insert(Blocker::Line(line_id));
                continue;
            }
            let Some(back) = geometry.back_sector(line) else {
                continue;
            };
            let (front, back) = (&geometry.sectors[geometry.front_sector(line)], &geometry.sectors[back]);
            let top = front.ceiling.z.min(back.ceiling.z);
            let bottom = front.floor.z.max(back.floor.z);
            let low_floor = front.floor.z.min(back.floor.z);
            if top < check.ceiling_z {
                check.ceiling_z = top;
                ceiling_line = Some(line_id);
            }
            if bottom > check.floor_z {
                check.floor_z = bottom;
                floor_line = Some(line_id);
            }
            check.dropoff_z = check.dropoff_z.min(low_floor);
        }

        let reach = entity.radius;
        for other_id in self.blockmap.entities_in(&bbox) {
            if other_id == entity.id {
                continue;
            }
            let Some(other) = entities.get(other_id) else { continue };
            let blockdist = reach.saturating_add(other.radius);
            if fixed_abs(other.position.x.wrapping_sub(center.x)) >= blockdist
                || fixed_abs(other.position.y.wrapping_sub(center.y)) >= blockdist
            {
                continue;
            }

            let overlaps_z = other.position.z < target.z.saturating_add(entity.height)
                && other.top() > target.z;

            if other.flags.pickup {
                if entity.is_player() && entity.is_alive() && overlaps_z {
                    check.touches.push(other_id);
                }
                continue;
            }

            if entity.is_missile() {
                if Some(other_id) != entity.owner
                    && overlaps_z
                    && (other.flags.solid || other.flags.shootable)
                {
                    check.blocker.get_or_insert(Blocker::Entity(other_id));
                }
                continue;
            }

            if !other.flags.solid || !entity.flags.solid {
                continue;
            }

            if other.top() <= target.z {
                check.floor_z = check.floor_z.max(other.top());
            } else if other.position.z >= target.z.saturating_add(entity.height) {
                check.ceiling_z = check.ceiling_z.min(other.position.z);
            } else if other.flags.act_like_bridge
                && other.top().saturating_sub(target.z) <= self.config.max_step_height
            {
                check.floor_z = check.floor_z.max(other.top());
            } else {
                check.blocker.get_or_insert(Blocker::Entity(other_id));
            }
        }

        if check.blocker.is_none() {
            check.blocker = self.window_blocker(entity, target, &check, floor_line, ceiling_line);
        }
        check
    }

    fn window_blocker(
        &self,
        entity: &Entity,
        target: FixedVec3,
        check: &PositionCheck,
        floor_line: Option<LineId>,
        ceiling_line: Option<LineId>,
    ) -> Option<Blocker> {
        let window = check.ceiling_z.saturating_sub(check.floor_z);
        if window < entity.height {
            return Some(Blocker::Height(floor_line.or(ceiling_line)));
        }
        if check.ceiling_z.saturating_sub(target.z) < entity.height {
            return Some(Blocker::Height(ceiling_line));
        }
        if check.floor_z.saturating_sub(target.z) > self.config.max_step_height {
            return Some(Blocker::Height(floor_line));
        }
        if entity.is_monster()
            && !entity.flags.no_gravity
            && check.floor_z.saturating_sub(check.dropoff_z) > self.config.max_step_height
        {
            return Some(Blocker::Height(None));
        }
        None
    }

    // =========================================================================
    // Per-tick movement
    // =========================================================================

    /// Run one tick of movement for `entity`.
    ///
    /// `entities` is only read for collision; the caller writes `entity`
    /// back afterwards.
    pub fn tick_entity(
        &mut self,
        geometry: &mut MapGeometry,
        entities: &EntityManager,
        entity: &mut Entity,
    ) -> MoveResult {
        let mut result = MoveResult::default();
        entity.prev_position = entity.position;

        // 1. Vertical movement
        self.move_z(entity, &mut result);

        // 2. Horizontal movement, split so no step is longer than the radius
        let mut crossed = BTreeSet::new();
        let mut touches = BTreeSet::new();
        entity.velocity.x = entity.velocity.x.clamp(-self.config.max_move, self.config.max_move);
        entity.velocity.y = entity.velocity.y.clamp(-self.config.max_move, self.config.max_move);
        let largest = fixed_abs(entity.velocity.x).max(fixed_abs(entity.velocity.y));
        let steps = if entity.radius > 0 { largest / entity.radius + 1 } else { 1 };
        let total = entity.velocity.xy();
        let base = FixedVec2::new(total.x / steps, total.y / steps);
        for i in 1..=steps {
            // Last step carries the division remainder
            let step = if i == steps {
                FixedVec2::new(total.x - base.x * (steps - 1), total.y - base.y * (steps - 1))
            } else {
                base
            };
            if step == FixedVec2::ZERO {
                continue;
            }
            let blocked = self.move_xy(geometry, entities, entity, step, &mut crossed, &mut touches);
            if let Some(blocker) = blocked {
                result.blocked = Some(blocker);
                break;
            }
        }
        result.crossed = crossed.into_iter().collect();
        result.touches = touches.into_iter().collect();

        // 3. Step up onto raised floors
        if entity.position.z < entity.floor_z && !entity.is_missile() {
            result.step_up = entity.floor_z.saturating_sub(entity.position.z);
            entity.position.z = entity.floor_z;
            entity.velocity.z = entity.velocity.z.max(0);
        }
        entity.on_ground = entity.position.z <= entity.floor_z;

        // 4. Friction
        if entity.on_ground && !entity.is_missile() {
            self.apply_friction(entity);
        }

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(
            entity = %entity.id,
            position = ?entity.position,
            velocity = ?entity.velocity,
            blocked = ?result.blocked,
            "Moved entity"
        );

        result
    }

    fn move_z(&self, entity: &mut Entity, result: &mut MoveResult) {
        if !entity.flags.no_gravity && entity.position.z > entity.floor_z {
            entity.velocity.z = entity.velocity.z.saturating_sub(self.config.gravity);
        }
        entity.position.z = entity.position.z.saturating_add(entity.velocity.z);

        if entity.position.z <= entity.floor_z {
            if entity.velocity.z < 0 || entity.position.z < entity.floor_z {
                result.hit_plane |= entity.is_missile();
            }
            entity.position.z = entity.floor_z;
            entity.velocity.z = entity.velocity.z.max(0);
        }

        let max_z = entity.ceiling_z.saturating_sub(entity.height);
        if entity.position.z > max_z {
            result.hit_plane |= entity.is_missile();
            entity.position.z = max_z.max(entity.floor_z);
            entity.velocity.z = entity.velocity.z.min(0);
        }
    }

    /// Move by `delta`, sliding on obstructions. Returns the last blocker.
    fn move_xy(
        &mut self,
        geometry: &mut MapGeometry,
        entities: &EntityManager,
        entity: &mut Entity,
        delta: FixedVec2,
        crossed: &mut BTreeSet<LineId>,
        touches: &mut BTreeSet<EntityId>,
    ) -> Option<Blocker> {
        let mut remaining = delta;
        let mut last_blocker = None;

        for _ in 0..self.config.max_slide_iterations {
            if remaining == FixedVec2::ZERO {
                break;
            }

            let target = entity.position.xy() + remaining;
            let check = self.check_position(geometry, entities, entity, target.with_z(entity.position.z));
            let Some(blocker) = check.blocker else {
                self.commit_move(geometry, entity, target, &check, crossed, touches);
                return last_blocker;
            };
            last_blocker = Some(blocker);

            // Furthest fraction that still fits
            let (fraction, best) = self.bisect(geometry, entities, entity, remaining);
            if let Some(best) = best {
                let stop = entity.position.xy() + remaining.scale(fraction);
                self.commit_move(geometry, entity, stop, &best, crossed, touches);
            }

            if entity.is_missile() {
                return last_blocker;
            }

            let leftover = remaining.scale(FIXED_ONE - fraction);
            match blocker.line() {
                Some(line) => {
                    let along = geometry.lines[line].delta();
                    remaining = leftover.project_onto(along);
                    let velocity = entity.velocity.xy().project_onto(along);
                    entity.velocity.x = velocity.x;
                    entity.velocity.y = velocity.y;
                }
                None => {
                    self.try_axis_moves(geometry, entities, entity, leftover, crossed, touches);
                    return last_blocker;
                }
            }
        }
        last_blocker
    }

    fn bisect(
        &self,
        geometry: &MapGeometry,
        entities: &EntityManager,
        entity: &Entity,
        delta: FixedVec2,
    ) -> (Fixed, Option<PositionCheck>) {
        let mut low = 0;
        let mut high = FIXED_ONE;
        let mut best = None;
        for _ in 0..self.config.bisect_steps {
            let mid = (low + high) / 2;
            let target = entity.position.xy() + delta.scale(mid);
            let check = self.check_position(geometry, entities, entity, target.with_z(entity.position.z));
            if check.fits() {
                low = mid;
                best = Some(check);
            } else {
                high = mid;
            }
        }
        (low, best)
    }

    fn try_axis_moves(
        &mut self,
        geometry: &mut MapGeometry,
        entities: &EntityManager,
        entity: &mut Entity,
        leftover: FixedVec2,
        crossed: &mut BTreeSet<LineId>,
        touches: &mut BTreeSet<EntityId>,
    ) {
        let axes = [FixedVec2::new(leftover.x, 0), FixedVec2::new(0, leftover.y)];
        for axis in axes {
            if axis == FixedVec2::ZERO {
                continue;
            }
            let target = entity.position.xy() + axis;
            let check = self.check_position(geometry, entities, entity, target.with_z(entity.position.z));
            if check.fits() {
                self.commit_move(geometry, entity, target, &check, crossed, touches);
                if axis.x == 0 {
                    entity.velocity.x = 0;
                } else {
                    entity.velocity.y = 0;
                }
                return;
            }
        }
        entity.velocity.x = 0;
        entity.velocity.y = 0;
    }

    fn commit_move(
        &mut self,
        geometry: &mut MapGeometry,
        entity: &mut Entity,
        target: FixedVec2,
        check: &PositionCheck,
        crossed: &mut BTreeSet<LineId>,
        touches: &mut BTreeSet<EntityId>,
    ) {
        let from = entity.position.xy();
        let path = BoundingBox::new(from, target);
        for line_id in self.blockmap.lines_in(&path) {
            let line = &geometry.lines[line_id];
            if line.has_special()
                && line.on_front(from) != line.on_front(target)
                && segments_intersect(from, target, line.start, line.end)
            {
                crossed.insert(line_id);
            }
        }
        touches.extend(check.touches.iter().copied());

        if let Some(sector) = geometry.sectors.get_mut(entity.sector) {
            sector.entities.remove(&entity.id);
        }
        entity.position.x = target.x;
        entity.position.y = target.y;
        entity.sector = check.sector;
        entity.floor_z = check.floor_z;
        entity.ceiling_z = check.ceiling_z;
        geometry.sectors[check.sector].entities.insert(entity.id);
        if !entity.flags.no_blockmap {
            self.blockmap.link(entity.id, &entity.bbox());
        }
    }

    fn apply_friction(&self, entity: &mut Entity) {
        let (vx, vy) = (entity.velocity.x, entity.velocity.y);
        if fixed_abs(vx) < self.config.stop_speed && fixed_abs(vy) < self.config.stop_speed {
            entity.velocity.x = 0;
            entity.velocity.y = 0;
            return;
        }
        entity.velocity.x = fixed_mul(vx, self.config.friction);
        entity.velocity.y = fixed_mul(vy, self.config.friction);
    }

    // =========================================================================
    // Use lines
    // =========================================================================

    /// Trace `use_range` units ahead of `entity` for a line to use.
    ///
    /// Lines are visited nearest first. The first line with a special is
    /// returned if the entity stands on its front side; a closed line without
    /// a special ends the trace.
    pub fn use_line(&self, geometry: &MapGeometry, entity: &Entity) -> Option<LineId> {
        let start = entity.position.xy();
        let end = start + entity.angle.to_vector(self.config.use_range);
        let trace = BoundingBox::new(start, end);

        let mut hits: Vec<(Fixed, LineId)> = self
            .blockmap
            .lines_in(&trace)
            .into_iter()
            .filter_map(|id| {
                let line = &geometry.lines[id];
                intersection_fraction(start, end, line.start, line.end).map(|t| (t, id))
            })
            .collect();
        hits.sort_unstable();

        for (_, id) in hits {
            let line = &geometry.lines[id];
            if line.has_special() {
                return line.on_front(start).then_some(id);
            }
            let open = geometry.back_sector(line).is_some_and(|back| {
                let (front, back) = (&geometry.sectors[geometry.front_sector(line)], &geometry.sectors[back]);
                front.ceiling.z.min(back.ceiling.z) > front.floor.z.max(back.floor.z)
            });
            if !open {
                return None;
            }
        }
        None
    }

    // =========================================================================
    // Sector planes
    // =========================================================================

    /// Move a sector's floor or ceiling to `new_z`.
    ///
    /// Entities touching the sector get their window recomputed: things
    /// standing on a moving floor ride it, things under a lowering ceiling
    /// are pushed down. If a live solid shootable entity no longer fits, the
    /// plane is put back and nothing changes; the status tells whether to
    /// crush it.
    pub fn move_sector_plane(
        &mut self,
        geometry: &mut MapGeometry,
        entities: &mut EntityManager,
        sector: SectorId,
        face: SectorPlaneFace,
        new_z: Fixed,
        crush: bool,
    ) -> MoveStatus {
        let Some(old_z) = geometry.sectors.get(sector).map(|s| s.plane(face).z) else {
            return MoveStatus::Blocked;
        };
        if old_z == new_z {
            return MoveStatus::Success;
        }
        geometry.sectors[sector].plane_mut(face).z = new_z;

        let mut candidates: BTreeSet<EntityId> = geometry.sectors[sector].entities.clone();
        if let Some(bbox) = geometry.sector_bbox(sector) {
            for id in self.blockmap.entities_in(&bbox) {
                if entities.get(id).is_some_and(|e| e.bbox().intersects(&bbox)) {
                    candidates.insert(id);
                }
            }
        }

        let mut updated = Vec::with_capacity(candidates.len());
        let mut stuck = Vec::new();
        for id in candidates {
            let Some(mut entity) = entities.get(id).cloned() else { continue };
            let check = self.check_position(geometry, entities, &entity, entity.position);
            let riding = entity.position.z <= entity.floor_z;

            if (riding && face == SectorPlaneFace::Floor) || entity.position.z < check.floor_z {
                entity.position.z = check.floor_z;
            }
            if entity.top() > check.ceiling_z {
                entity.position.z = check.ceiling_z.saturating_sub(entity.height).max(check.floor_z);
            }
            entity.floor_z = check.floor_z;
            entity.ceiling_z = check.ceiling_z;
            entity.on_ground = entity.position.z <= entity.floor_z;

            if check.ceiling_z.saturating_sub(check.floor_z) < entity.height && entity.blocks_sector_move() {
                stuck.push(id);
            }
            updated.push(entity);
        }

        if !stuck.is_empty() {
            geometry.sectors[sector].plane_mut(face).z = old_z;
            return if crush { MoveStatus::Crushed(stuck) } else { MoveStatus::Blocked };
        }

        for entity in updated {
            entities.update(entity);
        }
        MoveStatus::Success
    }
}

// =============================================================================
// Segment math
// =============================================================================

/// Whether the box has corners strictly on both sides of the line.
fn box_crosses_line(bbox: &BoundingBox, start: FixedVec2, delta: FixedVec2) -> bool {
    let mut front = false;
    let mut back = false;
    for corner in bbox.corners() {
        match delta.cross_wide(corner - start).signum() {
            -1 => front = true,
            1 => back = true,
            _ => {}
        }
    }
    front && back
}

/// Fraction along `a0 → a1` where it meets segment `b0 → b1`, if it does.
fn intersection_fraction(a0: FixedVec2, a1: FixedVec2, b0: FixedVec2, b1: FixedVec2) -> Option<Fixed> {
    let r = a1 - a0;
    let s = b1 - b0;
    let denom = r.cross_wide(s);
    if denom == 0 {
        return None;
    }
    let qp = b0 - a0;
    let t = qp.cross_wide(s);
    let u = qp.cross_wide(r);
    let (t, u, denom) = if denom < 0 { (-t, -u, -denom) } else { (t, u, denom) };
    if t < 0 || t > denom || u < 0 || u > denom {
        return None;
    }
    Some(((t << 16) / denom) as Fixed)
}

fn segments_intersect(a0: FixedVec2, a1: FixedVec2, b0: FixedVec2, b1: FixedVec2) -> bool {
    intersection_fraction(a0, a1, b0, b1).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angle::Angle;
    use crate::core::fixed::from_int;
    use crate::entity::{DefinitionRegistry, SpawnRequest};
    use crate::geometry::GeometryBuilder;
    use crate::map::{demo, MapData};
    use crate::world::config::SkillLevel;

    struct Fixture {
        geometry: MapGeometry,
        physics: PhysicsManager,
        entities: EntityManager,
    }

    impl Fixture {
        fn new(map: &MapData) -> Self {
            let geometry = GeometryBuilder::build(map).unwrap();
            let physics = PhysicsManager::new(PhysicsConfig::default(), &geometry);
            let entities = EntityManager::new(DefinitionRegistry::doom_defaults(), SkillLevel::Medium);
            Self { geometry, physics, entities }
        }

        fn spawn(&mut self, name: &str, x: i32, y: i32) -> EntityId {
            let definition = self.entities.definitions().id_by_name(name).unwrap();
            let request = SpawnRequest {
                is_map_init: true,
                ..SpawnRequest::new(definition, FixedVec3::from_ints(x, y, 0))
            };
            self.entities.create(&mut self.geometry, &mut self.physics, request).unwrap()
        }

        fn player(&mut self, x: i32, y: i32, angle: Angle) -> EntityId {
            let id = self.spawn("DoomPlayer", x, y);
            let body = self.entities.get_mut(id).unwrap();
            body.player = Some(0);
            body.angle = angle;
            id
        }

        fn push(&mut self, id: EntityId, vx: i32, vy: i32) {
            let body = self.entities.get_mut(id).unwrap();
            body.velocity.x = from_int(vx);
            body.velocity.y = from_int(vy);
        }

        fn tick(&mut self, id: EntityId) -> MoveResult {
            let mut entity = self.entities.get(id).cloned().unwrap();
            let result = self.physics.tick_entity(&mut self.geometry, &self.entities, &mut entity);
            self.entities.update(entity);
            result
        }

        fn entity(&self, id: EntityId) -> &Entity {
            self.entities.get(id).unwrap()
        }
    }

    #[test]
    fn test_box_crossing() {
        let bbox = BoundingBox::around(FixedVec2::from_ints(10, 10), from_int(4));
        let vertical = FixedVec2::from_ints(0, 64);
        assert!(box_crosses_line(&bbox, FixedVec2::from_ints(8, 0), vertical));
        // Flush against the line does not count
        assert!(!box_crosses_line(&bbox, FixedVec2::from_ints(14, 0), vertical));
        assert!(!box_crosses_line(&bbox, FixedVec2::from_ints(20, 0), vertical));
    }

    #[test]
    fn test_intersection_fraction() {
        let t = intersection_fraction(
            FixedVec2::from_ints(0, 0),
            FixedVec2::from_ints(100, 0),
            FixedVec2::from_ints(25, -10),
            FixedVec2::from_ints(25, 10),
        );
        assert_eq!(t, Some(FIXED_ONE / 4));
        assert!(intersection_fraction(
            FixedVec2::from_ints(0, 0),
            FixedVec2::from_ints(10, 0),
            FixedVec2::from_ints(25, -10),
            FixedVec2::from_ints(25, 10),
        )
        .is_none());
    }

    #[test]
    fn test_link_sets_sector_and_window() {
        let mut f = Fixture::new(&demo::door_room());
        let id = f.spawn("DoomImp", 432, 96);
        let imp = f.entity(id);
        assert_eq!(imp.sector, demo::LIFT_SECTOR);
        assert_eq!(imp.floor_z, from_int(24));
        assert_eq!(imp.ceiling_z, from_int(160));
        assert!(imp.on_ground);
        assert!(f.physics.blockmap().is_linked(id));
    }

    #[test]
    fn test_walls_block_and_slide() {
        let mut f = Fixture::new(&demo::square_room(256, 0, 128));
        let id = f.player(128, 128, Angle::EAST);

        // Straight into the east wall: stops flush, radius away
        f.push(id, 30, 0);
        for _ in 0..10 {
            f.tick(id);
        }
        let body = f.entity(id);
        assert!(body.position.x <= from_int(240));
        assert!(body.position.x > from_int(236));
        assert_eq!(body.position.y, from_int(128));

        // Diagonal into the wall slides north along it
        f.push(id, 10, 10);
        let result = f.tick(id);
        assert!(result.blocked.and_then(|b| b.line()).is_some());
        let body = f.entity(id);
        assert!(body.position.y > from_int(128));
        assert!(body.position.x <= from_int(240));
        assert!(body.velocity.x.abs() < FIXED_ONE);
    }

    #[test]
    fn test_step_limits() {
        let mut f = Fixture::new(&demo::door_room());

        // The lift is 24 units up: climbable
        let id = f.player(380, 96, Angle::EAST);
        f.push(id, 8, 0);
        let mut climbed = 0;
        for _ in 0..6 {
            climbed += f.tick(id).step_up;
        }
        let body = f.entity(id);
        assert_eq!(body.position.z, from_int(24));
        assert_eq!(climbed, from_int(24));

        // Forty units is not
        let mut f = Fixture::new(&demo::door_room());
        f.geometry.sectors[demo::LIFT_SECTOR].floor.z = from_int(40);
        let other = f.player(380, 200, Angle::EAST);
        let check = f.physics.check_position(
            &f.geometry,
            &f.entities,
            f.entity(other),
            FixedVec3::from_ints(400, 100, 0),
        );
        assert!(matches!(check.blocker, Some(Blocker::Height(Some(_)))));
    }

    #[test]
    fn test_closed_door_blocks() {
        let mut f = Fixture::new(&demo::door_room());
        let id = f.player(230, 128, Angle::EAST);
        f.push(id, 20, 0);
        let result = f.tick(id);
        assert!(result.blocked.is_some());
        assert!(f.entity(id).position.x <= from_int(240));
    }

    #[test]
    fn test_gravity_and_landing() {
        let mut f = Fixture::new(&demo::square_room(256, 0, 128));
        let id = f.spawn("DoomImp", 64, 64);
        let imp = f.entities.get_mut(id).unwrap();
        imp.position.z = from_int(10);
        imp.on_ground = false;
        let mut ticks = 0;
        while !f.entity(id).on_ground {
            f.tick(id);
            ticks += 1;
            assert!(ticks < 10);
        }
        assert_eq!(f.entity(id).position.z, 0);
        assert_eq!(f.entity(id).velocity.z, 0);

        // Stays put on the floor afterwards
        for _ in 0..35 {
            f.tick(id);
            let imp = f.entity(id);
            assert!(imp.on_ground);
            assert_eq!(imp.position.z, 0);
            assert_eq!(imp.velocity.z, 0);
        }
    }

    #[test]
    fn test_substeps_cover_full_velocity() {
        let mut f = Fixture::new(&demo::square_room(256, 0, 128));
        let id = f.spawn("DoomImp", 64, 128);
        // Two sub-steps; an odd raw speed leaves a remainder
        f.entities.get_mut(id).unwrap().velocity.x = from_int(25) + 1;
        f.tick(id);
        assert_eq!(f.entity(id).position.x, from_int(89) + 1);

        let id = f.spawn("DoomImp", 192, 64);
        f.entities.get_mut(id).unwrap().velocity.x = -(from_int(25) + 1);
        f.tick(id);
        assert_eq!(f.entity(id).position.x, from_int(167) - 1);
    }

    #[test]
    fn test_solid_entities_block() {
        let mut f = Fixture::new(&demo::square_room(256, 0, 128));
        let barrel = f.spawn("ExplosiveBarrel", 128, 128);
        let id = f.player(80, 128, Angle::EAST);
        let check = f.physics.check_position(
            &f.geometry,
            &f.entities,
            f.entity(id),
            FixedVec3::from_ints(110, 128, 0),
        );
        assert_eq!(check.blocker, Some(Blocker::Entity(barrel)));

        // Standing on top of it is allowed
        let check = f.physics.check_position(
            &f.geometry,
            &f.entities,
            f.entity(id),
            FixedVec3::from_ints(110, 128, 42),
        );
        assert!(check.fits());
        assert_eq!(check.floor_z, from_int(42));
    }

    #[test]
    fn test_pickups_are_touched() {
        let mut f = Fixture::new(&demo::square_room(256, 0, 128));
        let clip = f.spawn("Clip", 140, 128);
        let id = f.player(100, 128, Angle::EAST);
        f.push(id, 20, 0);
        let result = f.tick(id);
        assert_eq!(result.touches, vec![clip]);
        assert!(result.blocked.is_none());
    }

    #[test]
    fn test_crossing_special_lines() {
        let mut f = Fixture::new(&demo::door_room());
        // Open the door so the player can walk through
        f.geometry.sectors[demo::DOOR_SECTOR].ceiling.z = from_int(128);
        let id = f.player(240, 128, Angle::EAST);
        f.push(id, 12, 0);
        let mut crossed = Vec::new();
        for _ in 0..4 {
            crossed.extend(f.tick(id).crossed);
        }
        assert_eq!(crossed, vec![demo::DOOR_LINE_A, demo::DOOR_LINE_B]);
        assert_eq!(f.entity(id).sector, demo::ROOM_B);
    }

    #[test]
    fn test_use_line_trace() {
        let mut f = Fixture::new(&demo::door_room());
        let id = f.player(32, 128, Angle::WEST);
        assert_eq!(f.physics.use_line(&f.geometry, f.entity(id)), Some(demo::SWITCH_LINE));

        // Out of reach
        let id = f.player(128, 128, Angle::WEST);
        assert_eq!(f.physics.use_line(&f.geometry, f.entity(id)), None);

        let id = f.player(210, 128, Angle::EAST);
        assert_eq!(f.physics.use_line(&f.geometry, f.entity(id)), Some(demo::DOOR_LINE_A));

        // A plain wall ends the trace
        let id = f.player(200, 220, Angle::NORTH);
        assert_eq!(f.physics.use_line(&f.geometry, f.entity(id)), None);
    }

    #[test]
    fn test_lift_carries_riders() {
        let mut f = Fixture::new(&demo::door_room());
        let id = f.player(432, 96, Angle::EAST);
        assert_eq!(f.entity(id).position.z, from_int(24));

        let status = f.physics.move_sector_plane(
            &mut f.geometry,
            &mut f.entities,
            demo::LIFT_SECTOR,
            SectorPlaneFace::Floor,
            from_int(16),
            false,
        );
        assert_eq!(status, MoveStatus::Success);
        assert_eq!(f.entity(id).position.z, from_int(16));
        assert_eq!(f.entity(id).floor_z, from_int(16));
    }

    #[test]
    fn test_closing_door_is_blocked_by_player() {
        let mut f = Fixture::new(&demo::door_room());
        f.geometry.sectors[demo::DOOR_SECTOR].ceiling.z = from_int(128);
        let id = f.player(264, 128, Angle::EAST);

        let status = f.physics.move_sector_plane(
            &mut f.geometry,
            &mut f.entities,
            demo::DOOR_SECTOR,
            SectorPlaneFace::Ceiling,
            from_int(40),
            false,
        );
        assert_eq!(status, MoveStatus::Blocked);
        assert_eq!(f.geometry.sectors[demo::DOOR_SECTOR].ceiling.z, from_int(128));

        let status = f.physics.move_sector_plane(
            &mut f.geometry,
            &mut f.entities,
            demo::DOOR_SECTOR,
            SectorPlaneFace::Ceiling,
            from_int(40),
            true,
        );
        assert_eq!(status, MoveStatus::Crushed(vec![id]));

        // Lowering above the player's head is fine and updates its window
        let status = f.physics.move_sector_plane(
            &mut f.geometry,
            &mut f.entities,
            demo::DOOR_SECTOR,
            SectorPlaneFace::Ceiling,
            from_int(100),
            false,
        );
        assert_eq!(status, MoveStatus::Success);
        assert_eq!(f.entity(id).ceiling_z, from_int(100));
    }
}
