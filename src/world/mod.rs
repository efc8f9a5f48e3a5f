//! World Simulation
//!
//! Owns every manager and drives them one fixed tick at a time.
//!
//! ```text
//!   set_command ──► players ──► entities ──► specials ──► gametick++
//!                   look,        behavior,    movers,
//!                   thrust,      physics,     teleports,
//!                   use          crossings,   crush damage
//!                                pickups
//! ```
//!
//! # Determinism
//!
//! Everything below this module is integer arithmetic over ordered
//! containers, and all randomness comes from the world's seeded
//! [`DeterministicRng`]. Two worlds loaded from the same map, definitions
//! and config, fed the same commands, hash identically after every tick.

pub mod config;
pub mod events;
pub mod runner;
pub mod snapshot;
pub mod ticker;

pub use config::{PhysicsConfig, SkillLevel, WorldConfig};
pub use events::{WorldEvent, WorldEventData};
pub use runner::{RunReport, WorldRunner};
pub use snapshot::{SnapshotError, WorldSnapshot};
pub use ticker::{TickAdvance, Ticker};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bsp::BspTree;
use crate::core::angle::{Angle, ANG45};
use crate::core::fixed::{from_int, Fixed};
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::FixedVec3;
use crate::entity::{
    ActorState, Behavior, Camera, DamageOutcome, DefinitionId, DefinitionRegistry, EntityError,
    EntityId, EntityManager, Player, SpawnRequest, TickCommand,
};
use crate::geometry::{ActivationContext, GeometryBuilder, GeometryError, LineId, MapGeometry};
use crate::map::MapData;
use crate::physics::{Blocker, MoveResult, PhysicsManager};
use crate::special::{ActivationArgs, SpecialManager};

/// Wander legs last this many ticks at least.
const MIN_WANDER_TICS: u32 = 4;

/// Random extra ticks added to a wander leg.
const WANDER_TICS_RANGE: u32 = 12;

/// World construction failures.
#[derive(Debug, Error)]
pub enum WorldError {
    /// The map geometry could not be built.
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),

    /// Entities could not be created.
    #[error("entities: {0}")]
    Entity(#[from] EntityError),

    /// A snapshot does not fit the map.
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    /// An operation named an entity that does not exist.
    #[error("no such entity {0}")]
    NoSuchEntity(EntityId),
}

/// A running map.
pub struct World {
    config: WorldConfig,
    geometry: MapGeometry,
    physics: PhysicsManager,
    entities: EntityManager,
    specials: SpecialManager,
    rng: DeterministicRng,
    gametick: u32,
    pending_events: Vec<WorldEvent>,
}

impl World {
    /// Build the geometry and BSP, populate the map and create the players.
    pub fn load(
        map: &MapData,
        definitions: DefinitionRegistry,
        config: WorldConfig,
    ) -> Result<Self, WorldError> {
        let mut geometry = GeometryBuilder::build(map)?;
        let mut physics = PhysicsManager::new(config.physics.clone(), &geometry);
        let mut entities = EntityManager::new(definitions, config.skill);

        entities.populate_from(&mut geometry, &mut physics, map);
        for index in 0..config.player_count {
            entities.create_player(&mut geometry, &mut physics, index)?;
        }

        info!(
            map = %geometry.name,
            sectors = geometry.sectors.len(),
            lines = geometry.lines.len(),
            entities = entities.len(),
            skill = config.skill.number(),
            "Loaded world"
        );

        Ok(Self {
            rng: DeterministicRng::new(config.seed),
            config,
            geometry,
            physics,
            entities,
            specials: SpecialManager::new(),
            gametick: 0,
            pending_events: Vec::new(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Config the world was loaded with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Ticks run so far.
    pub fn gametick(&self) -> u32 {
        self.gametick
    }

    /// Map geometry.
    pub fn geometry(&self) -> &MapGeometry {
        &self.geometry
    }

    /// BSP tree of the map.
    pub fn bsp(&self) -> &BspTree {
        &self.geometry.bsp
    }

    /// Live entities.
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Players.
    pub fn players(&self) -> &[Player] {
        self.entities.players()
    }

    /// Running specials.
    pub fn specials(&self) -> &SpecialManager {
        &self.specials
    }

    /// Physics state (blockmap).
    pub fn physics(&self) -> &PhysicsManager {
        &self.physics
    }

    /// Camera of player `index` at `fraction` of the way into the next tick.
    pub fn camera(&self, index: usize, fraction: Fixed) -> Option<Camera> {
        let player = self.entities.player(index)?;
        let body = self.entities.get(player.entity)?;
        Some(player.camera(body, fraction))
    }

    /// Set the command player `index` runs on the next tick. Commands are
    /// consumed by the tick. Returns false for unknown players.
    pub fn set_command(&mut self, index: usize, command: TickCommand) -> bool {
        match self.entities.player_mut(index) {
            Some(player) => {
                player.command = command;
                true
            }
            None => false,
        }
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Run one tick.
    pub fn tick(&mut self) {
        // 1. Players: look, thrust, powerups, use
        self.tick_players();

        // 2. Entities: behavior, movement, crossings, pickups
        self.tick_entities();

        // 3. Specials, then the damage they asked for
        self.specials.tick(&mut self.geometry, &mut self.entities, &mut self.physics, self.gametick);
        self.collect_special_events();

        // 4. Advance tick counter
        self.gametick += 1;
    }

    fn tick_players(&mut self) {
        let indices: Vec<usize> = self.entities.players().iter().map(|p| p.index).collect();

        for index in indices {
            let Some(mut player) = self.entities.player(index).cloned() else { continue };
            let Some(mut body) = self.entities.get(player.entity).cloned() else {
                warn!(player = index, entity = %player.entity, "Player body is gone");
                continue;
            };

            let alive = body.is_alive();
            if alive {
                player.apply_look(&mut body);
                if body.on_ground {
                    let thrust = player.command.thrust(body.angle);
                    body.velocity.x = body.velocity.x.saturating_add(thrust.x);
                    body.velocity.y = body.velocity.y.saturating_add(thrust.y);
                }
            }
            player.inventory.tick();

            let use_pressed = alive && player.use_pressed();
            player.use_held = player.command.has(TickCommand::USE);
            player.command = TickCommand::default();
            player.tick_view();

            let used = if use_pressed { self.physics.use_line(&self.geometry, &body) } else { None };
            let activator = body.id;
            self.entities.update(body);
            if let Some(slot) = self.entities.player_mut(index) {
                *slot = player;
            }

            if let Some(line) = used {
                self.activate_line(line, activator, ActivationContext::UseLine);
            }
        }
    }

    fn tick_entities(&mut self) {
        for id in self.entities.ids() {
            // Destroyed earlier this tick
            let Some(behavior) = self.entities.definition_of(id).map(|def| def.behavior) else {
                continue;
            };

            self.tick_behavior(id, behavior);

            let Some(mut entity) = self.entities.get(id).cloned() else { continue };
            let result = self.physics.tick_entity(&mut self.geometry, &self.entities, &mut entity);
            let (is_missile, is_monster, player) = (entity.is_missile(), entity.is_monster(), entity.player);
            self.entities.update(entity);

            if is_missile && (result.hit_plane || result.blocked.is_some()) {
                self.explode_missile(id, &result);
                continue;
            }
            if is_monster && result.blocked.is_some() {
                if let Some(monster) = self.entities.get_mut(id) {
                    monster.move_count = 0;
                }
            }
            for &line in &result.crossed {
                self.activate_line(line, id, ActivationContext::CrossLine);
            }
            if let Some(index) = player {
                if result.step_up > 0 {
                    if let Some(p) = self.entities.player_mut(index) {
                        p.absorb_step(result.step_up);
                    }
                }
                for &item in &result.touches {
                    self.pick_up(index, item);
                }
            }
        }
    }

    fn tick_behavior(&mut self, id: EntityId, behavior: Behavior) {
        let speed = self.entities.definition_of(id).map_or(0, |def| from_int(def.speed));
        let Some(entity) = self.entities.get_mut(id) else { return };

        match entity.state {
            ActorState::Dying => {
                if entity.state_tics <= 1 {
                    entity.state = ActorState::Dead;
                    entity.state_tics = 0;
                } else {
                    entity.state_tics -= 1;
                }
                return;
            }
            ActorState::Dead => return,
            ActorState::Spawn | ActorState::Active => {}
        }

        if behavior != Behavior::Monster {
            return;
        }

        if entity.state == ActorState::Spawn {
            if entity.state_tics <= 1 {
                entity.state = ActorState::Active;
                entity.state_tics = 0;
            } else {
                entity.state_tics -= 1;
            }
            return;
        }

        // Wander in one of eight directions, picking a new one per leg
        if entity.move_count == 0 {
            entity.angle = Angle(self.rng.next_int(8) * ANG45);
            entity.move_count = MIN_WANDER_TICS + self.rng.next_int(WANDER_TICS_RANGE);
        } else {
            entity.move_count -= 1;
        }
        if entity.on_ground {
            let step = entity.angle.to_vector(speed);
            entity.velocity.x = step.x;
            entity.velocity.y = step.y;
        }
    }

    // =========================================================================
    // Interactions
    // =========================================================================

    /// Trigger a line as if `activator` used or crossed it. Returns whether a
    /// special started.
    pub fn activate_line(&mut self, line: LineId, activator: EntityId, context: ActivationContext) -> bool {
        let args = ActivationArgs { line, activator, context };
        self.specials
            .add_activated_line_special(&mut self.geometry, &self.entities, self.gametick, args)
    }

    /// Damage an entity and report the outcome as events.
    pub fn damage(&mut self, id: EntityId, amount: i32) -> DamageOutcome {
        let outcome = self.entities.damage(id, amount);
        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Hurt { health } => {
                self.push_event(WorldEventData::EntityDamaged { entity: id, amount, health });
            }
            DamageOutcome::Killed => {
                let position = self.entities.get(id).map(|e| e.position).unwrap_or(FixedVec3::ZERO);
                let sound = self.entities.definition_of(id).and_then(|def| def.death_sound.clone());
                if let Some(sound) = sound {
                    self.pending_events.push(WorldEvent::sound(self.gametick, sound, position));
                }
                self.push_event(WorldEventData::EntityDied { entity: id });
                debug!(entity = %id, "Entity died");
            }
        }
        outcome
    }

    /// Fire a projectile of `definition` from `owner` along its facing.
    pub fn spawn_missile(&mut self, owner: EntityId, definition: DefinitionId) -> Result<EntityId, WorldError> {
        let (position, angle, height) = self
            .entities
            .get(owner)
            .map(|e| (e.position, e.angle, e.height))
            .ok_or(WorldError::NoSuchEntity(owner))?;
        let speed = self
            .entities
            .definitions()
            .get(definition)
            .map(|def| from_int(def.speed))
            .ok_or(EntityError::UnknownDefinition(definition))?;

        let origin = FixedVec3::new(position.x, position.y, position.z.saturating_add(height / 2));
        let request = SpawnRequest::new(definition, origin).with_angle(angle);
        let id = self.entities.create(&mut self.geometry, &mut self.physics, request)?;
        if let Some(missile) = self.entities.get_mut(id) {
            let direction = angle.to_vector(speed);
            missile.velocity = FixedVec3::new(direction.x, direction.y, 0);
            missile.owner = Some(owner);
        }
        Ok(id)
    }

    fn explode_missile(&mut self, id: EntityId, result: &MoveResult) {
        let Some(missile) = self.entities.get(id) else { return };
        let position = missile.position;
        let (base_damage, sound) = self
            .entities
            .definition_of(id)
            .map_or((0, None), |def| (def.damage, def.death_sound.clone()));

        if let Some(Blocker::Entity(target)) = result.blocked {
            let amount = (self.rng.roll(8) as i32).saturating_mul(base_damage);
            self.damage(target, amount);
        }
        if let Some(sound) = sound {
            self.pending_events.push(WorldEvent::sound(self.gametick, sound, position));
        }
        self.entities.destroy(&mut self.geometry, &mut self.physics, id);
    }

    fn pick_up(&mut self, player: usize, item: EntityId) {
        let Some(definition) = self.entities.get(item).map(|e| e.definition) else { return };
        let Some(def) = self.entities.definitions().get(definition) else { return };
        let Some(props) = def.item.as_ref() else { return };
        let (amount, name, sound) = (props.amount, def.name.clone(), props.pickup_sound.clone());

        if !self.entities.give_item(player, definition, amount) {
            return;
        }

        let position = self.entities.get(item).map(|e| e.position).unwrap_or(FixedVec3::ZERO);
        self.entities.destroy(&mut self.geometry, &mut self.physics, item);
        if let Some(sound) = sound {
            self.pending_events.push(WorldEvent::sound(self.gametick, sound, position));
        }
        debug!(player, item = %name, "Picked up item");
        self.push_event(WorldEventData::ItemPickedUp { player, item: name });
    }

    fn collect_special_events(&mut self) {
        for event in self.specials.take_events() {
            if let WorldEventData::Crush { entity, damage } = event.data {
                self.pending_events.push(event);
                self.damage(entity, damage);
            } else {
                self.pending_events.push(event);
            }
        }
    }

    fn push_event(&mut self, data: WorldEventData) {
        self.pending_events.push(WorldEvent::new(self.gametick, data));
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    /// Hash of everything that evolves during play.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.gametick, self.config.seed, |h| {
            let [s0, s1] = self.rng.state();
            h.update_u64(s0);
            h.update_u64(s1);

            for sector in &self.geometry.sectors {
                h.update_fixed(sector.floor.z);
                h.update_fixed(sector.ceiling.z);
                h.update_bool(sector.is_moving);
            }
            for line in &self.geometry.lines {
                h.update_bool(line.activated);
                h.update_u32(line.data_changes);
            }

            h.update_u32(self.entities.len() as u32);
            for entity in self.entities.iter() {
                h.update_u32(entity.id.0);
                h.update_u32(entity.definition.0 as u32);
                h.update_vec3(entity.position);
                h.update_vec3(entity.velocity);
                h.update_u32(entity.angle.0);
                h.update_i32(entity.health);
                h.update_u8(entity.state as u8);
                h.update_u32(entity.state_tics);
                h.update_u32(entity.move_count);
            }

            for player in self.entities.players() {
                h.update_u32(player.index as u32);
                h.update_fixed(player.view_height);
                h.update_fixed(player.pitch);
                for item in player.inventory.items() {
                    h.update_str(&item.name);
                    h.update_i32(item.amount);
                }
            }

            h.update_u32(self.specials.len() as u32);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::angle::ANG180;
    use crate::geometry::{LineFlags, SpecialArgs};
    use crate::map::demo;
    use crate::special::LineSpecialType;

    fn load() -> World {
        World::load(&demo::door_room(), DefinitionRegistry::doom_defaults(), WorldConfig::default()).unwrap()
    }

    /// Demo world without its wandering monsters.
    fn quiet() -> World {
        let mut world = load();
        let monsters: Vec<EntityId> = world.entities.iter().filter(|e| e.is_monster()).map(|e| e.id).collect();
        for id in monsters {
            world.entities.destroy(&mut world.geometry, &mut world.physics, id);
        }
        world
    }

    fn body(world: &World) -> EntityId {
        world.players()[0].entity
    }

    fn place(world: &mut World, id: EntityId, x: i32, y: i32, angle: Angle) {
        let mut entity = world.entities.get(id).cloned().unwrap();
        world.physics.unlink_entity(&mut world.geometry, &entity);
        entity.position = FixedVec3::from_ints(x, y, 0);
        entity.velocity = FixedVec3::ZERO;
        entity.angle = angle;
        world.physics.link_entity(&mut world.geometry, &world.entities, &mut entity);
        entity.reset_interpolation();
        world.entities.update(entity);
    }

    fn walk(world: &mut World, ticks: u32) {
        for _ in 0..ticks {
            world.set_command(0, TickCommand::forward(50));
            world.tick();
        }
    }

    #[test]
    fn test_load_populates_and_spawns_player() {
        let world = load();
        assert_eq!(world.gametick(), 0);
        assert_eq!(world.players().len(), 1);
        // Nine map things at medium skill in single player, plus the body
        assert_eq!(world.entities().len(), 10);

        let player = world.entities().get(body(&world)).unwrap();
        assert_eq!(player.position, FixedVec3::from_ints(32, 128, 0));
        assert_eq!(player.sector, demo::ROOM_A);
        assert!(world.bsp().subsectors().len() > 1);
    }

    #[test]
    fn test_missing_player_class_is_fatal() {
        let result = World::load(&demo::door_room(), DefinitionRegistry::new(), WorldConfig::default());
        assert!(matches!(result, Err(WorldError::Entity(EntityError::MissingPlayerClass(_)))));
    }

    #[test]
    fn test_use_switch_opens_door() {
        let mut world = quiet();
        world.set_command(
            0,
            TickCommand { angle_turn: ANG180 as i32, buttons: TickCommand::USE, ..TickCommand::default() },
        );
        world.tick();

        assert_eq!(world.gametick(), 1);
        assert!(world.geometry().lines[demo::SWITCH_LINE].activated);
        assert_eq!(world.geometry().sectors[demo::DOOR_SECTOR].ceiling.z, from_int(2));
        let events = world.take_events();
        assert!(events.iter().any(|e| matches!(
            e.data,
            WorldEventData::LineActivated { line: demo::SWITCH_LINE, special: LineSpecialType::DoorOpen, .. }
        )));

        // The command was consumed: no more turning, no second use
        let angle = world.entities().get(body(&world)).unwrap().angle;
        assert_eq!(angle, Angle::WEST);
        for _ in 0..79 {
            world.tick();
        }
        assert_eq!(world.entities().get(body(&world)).unwrap().angle, angle);
        assert_eq!(world.geometry().sectors[demo::DOOR_SECTOR].ceiling.z, from_int(160));
        assert!(world.specials().is_empty());
    }

    #[test]
    fn test_walking_picks_up_items() {
        let mut world = quiet();
        let id = body(&world);
        place(&mut world, id, 96, 64, Angle::EAST);

        walk(&mut world, 1);
        assert_eq!(world.players()[0].inventory.amount("Clip"), 30);
        assert!(world.entities().iter().all(|e| world.entities().definitions().get(e.definition).unwrap().name != "Clip"));
        let events = world.take_events();
        assert!(events.iter().any(|e| e.data == WorldEventData::ItemPickedUp { player: 0, item: "Clip".to_string() }));
        assert!(events.iter().any(|e| e.sound_name() == Some("misc/ammo_pkup")));
    }

    #[test]
    fn test_crossing_line_triggers_special() {
        let mut world = quiet();
        let lift_south = 14;
        {
            let line = &mut world.geometry.lines[lift_south];
            line.special = LineSpecialType::DoorOpen;
            line.args = SpecialArgs([demo::DOOR_TAG, 16, 0, 0, 0]);
            line.flags = LineFlags(line.flags.0 | LineFlags::PLAYER_CROSS);
        }
        let id = body(&world);
        place(&mut world, id, 432, 40, Angle::NORTH);

        // The center crosses on the sixth tick and is well onto the lift by the eighth
        walk(&mut world, 8);
        assert!(world.geometry().lines[lift_south].activated);
        assert!(world.geometry().sectors[demo::DOOR_SECTOR].ceiling.z > 0);

        // Stepped up onto the lift
        let player = world.entities().get(id).unwrap();
        assert_eq!(player.sector, demo::LIFT_SECTOR);
        assert_eq!(player.position.z, from_int(24));
    }

    #[test]
    fn test_crusher_kills_barrel() {
        let mut world = quiet();
        {
            let line = &mut world.geometry.lines[demo::LIFT_LINE];
            line.special = LineSpecialType::CeilingLowerAndCrush;
            line.args = SpecialArgs([0, 64, 0, 0, 0]);
        }
        let barrel_def = world.entities.definitions().id_by_name("ExplosiveBarrel").unwrap();
        let request = SpawnRequest::new(barrel_def, FixedVec3::from_ints(432, 96, 24));
        let barrel = world.entities.create(&mut world.geometry, &mut world.physics, request).unwrap();

        assert!(world.activate_line(demo::LIFT_LINE, body(&world), ActivationContext::UseLine));
        for _ in 0..100 {
            world.tick();
        }

        let events = world.take_events();
        assert!(events.iter().any(|e| matches!(e.data, WorldEventData::Crush { entity, .. } if entity == barrel)));
        assert!(events.iter().any(|e| e.data == WorldEventData::EntityDied { entity: barrel }));
        assert!(!world.entities().get(barrel).unwrap().is_alive());
        assert_eq!(world.geometry().sectors[demo::LIFT_SECTOR].ceiling.z, from_int(24));
        assert!(!world.geometry().sectors[demo::LIFT_SECTOR].is_moving);
    }

    #[test]
    fn test_missile_hits_barrel() {
        let mut world = quiet();
        let id = body(&world);
        place(&mut world, id, 200, 120, Angle::NORTH);
        let barrel = world
            .entities()
            .iter()
            .find(|e| world.entities().definitions().get(e.definition).unwrap().name == "ExplosiveBarrel")
            .map(|e| e.id)
            .unwrap();

        let ball = world.entities.definitions().id_by_name("DoomImpBall").unwrap();
        let missile = world.spawn_missile(id, ball).unwrap();
        assert_eq!(world.entities().get(missile).unwrap().owner, Some(id));

        for _ in 0..20 {
            world.tick();
        }
        assert!(!world.entities().contains(missile));
        let events = world.take_events();
        assert!(events.iter().any(|e| e.sound_name() == Some("imp/shotx")));
        assert!(events.iter().any(|e| matches!(
            e.data,
            WorldEventData::EntityDamaged { entity, .. } | WorldEventData::EntityDied { entity } if entity == barrel
        )));
    }

    #[test]
    fn test_missile_from_missing_owner() {
        let mut world = quiet();
        let ball = world.entities.definitions().id_by_name("DoomImpBall").unwrap();
        assert!(matches!(world.spawn_missile(EntityId(999), ball), Err(WorldError::NoSuchEntity(_))));
    }

    #[test]
    fn test_monsters_wake_and_wander() {
        let mut world = load();
        let imp = world.entities().iter().find(|e| e.is_monster()).map(|e| e.id).unwrap();
        let start = world.entities().get(imp).unwrap().position;

        for _ in 0..9 {
            world.tick();
        }
        assert_eq!(world.entities().get(imp).unwrap().state, ActorState::Spawn);
        world.tick();
        assert_eq!(world.entities().get(imp).unwrap().state, ActorState::Active);

        for _ in 0..35 {
            world.tick();
        }
        assert_ne!(world.entities().get(imp).unwrap().position, start);
    }

    #[test]
    fn test_identical_worlds_hash_identically() {
        let mut a = load();
        let mut b = load();
        assert_eq!(a.compute_hash(), b.compute_hash());

        for tick in 0..200 {
            let command = if tick % 3 == 0 { TickCommand::forward(50) } else { TickCommand::default() };
            a.set_command(0, command);
            b.set_command(0, command);
            a.tick();
            b.tick();
        }
        assert_eq!(a.compute_hash(), b.compute_hash());

        let config = WorldConfig { seed: 99, ..WorldConfig::default() };
        let c = World::load(&demo::door_room(), DefinitionRegistry::doom_defaults(), config).unwrap();
        assert_ne!(c.compute_hash(), load().compute_hash());
    }

    #[test]
    fn test_camera_follows_body() {
        let world = load();
        let camera = world.camera(0, 0).unwrap();
        assert_eq!(camera.position, FixedVec3::from_ints(32, 128, 41));
        assert!(world.camera(3, 0).is_none());
    }
}
