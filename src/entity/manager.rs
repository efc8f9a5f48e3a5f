//! Entity creation, destruction, lookup and map population.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::angle::Angle;
use crate::core::fixed::{Fixed, FIXED_MIN};
use crate::core::vec2::FixedVec3;
use crate::geometry::MapGeometry;
use crate::map::{MapData, MapThing};
use crate::physics::PhysicsManager;
use crate::world::config::SkillLevel;
use super::definition::{
    DefinitionId, DefinitionRegistry, EntityDefinition, ItemKind, PowerupType, PLAYER_CLASS,
};
use super::list::EntityList;
use super::player::Player;
use super::spawn::SpawnLocations;
use super::{ActorState, AvailableIndexTracker, Entity, EntityId};

/// Height hint meaning "not given": the entity goes on the floor.
pub const Z_HINT_UNSET: Fixed = FIXED_MIN;

/// Thing id meaning "no tid".
pub const NO_TID: i32 = 0;

/// Whether a height hint carries a height. Zero counts as unset.
#[inline]
pub fn z_height_set(z: Fixed) -> bool {
    z != Z_HINT_UNSET && z != 0
}

/// Entity layer failures.
#[derive(Debug, Error)]
pub enum EntityError {
    /// The player class is not defined, so no player can exist.
    #[error("missing player definition class {0}")]
    MissingPlayerClass(&'static str),

    /// A spawn request named a definition that does not exist.
    #[error("unknown entity definition {0:?}")]
    UnknownDefinition(DefinitionId),
}

/// Parameters of [`EntityManager::create`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Definition to instantiate
    pub definition: DefinitionId,
    /// Position; Z is used only when no height hint applies
    pub position: FixedVec3,
    /// Height above the sector floor, or [`Z_HINT_UNSET`]
    pub z_hint: Fixed,
    /// Facing
    pub angle: Angle,
    /// Thing id
    pub tid: i32,
    /// Created while populating the map
    pub is_map_init: bool,
}

impl SpawnRequest {
    /// Spawn `definition` at `position` with no hint, tid or facing.
    pub fn new(definition: DefinitionId, position: FixedVec3) -> Self {
        Self {
            definition,
            position,
            z_hint: Z_HINT_UNSET,
            angle: Angle::EAST,
            tid: NO_TID,
            is_map_init: false,
        }
    }

    /// Set the facing.
    pub fn with_angle(mut self, angle: Angle) -> Self {
        self.angle = angle;
        self
    }

    /// Set the thing id.
    pub fn with_tid(mut self, tid: i32) -> Self {
        self.tid = tid;
        self
    }
}

/// Result of [`EntityManager::damage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Nothing happened (not shootable, already dead, invulnerable)
    Ignored,
    /// Took damage and survived
    Hurt {
        /// Health left
        health: i32,
    },
    /// Took damage and died
    Killed,
}

/// Owns every live entity and the definitions they are made from.
#[derive(Clone, Debug)]
pub struct EntityManager {
    definitions: DefinitionRegistry,
    slots: Vec<Option<Entity>>,
    list: EntityList,
    ids: AvailableIndexTracker,
    tid_lookup: HashMap<i32, BTreeSet<EntityId>>,
    spawn_locations: SpawnLocations,
    players: Vec<Player>,
    skill: SkillLevel,
}

impl EntityManager {
    /// Create an empty manager.
    pub fn new(definitions: DefinitionRegistry, skill: SkillLevel) -> Self {
        Self {
            definitions,
            slots: Vec::new(),
            list: EntityList::new(),
            ids: AvailableIndexTracker::new(),
            tid_lookup: HashMap::new(),
            spawn_locations: SpawnLocations::new(),
            players: Vec::new(),
            skill,
        }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Definition registry.
    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.definitions
    }

    /// Definition of a live entity.
    pub fn definition_of(&self, id: EntityId) -> Option<&EntityDefinition> {
        self.get(id).and_then(|entity| self.definitions.get(entity.definition))
    }

    /// A live entity.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// A live entity, mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Write back a modified copy of a live entity. Returns false if the
    /// entity was destroyed meanwhile.
    pub fn update(&mut self, entity: Entity) -> bool {
        match self.get_mut(entity.id) {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Live entities in list (tick) order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.list.iter().filter_map(move |id| self.get(id))
    }

    /// Ids in list order, detached from the manager so the caller may mutate
    /// while walking them.
    pub fn ids(&self) -> Vec<EntityId> {
        self.list.iter().collect()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// True if no entity is live.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Live entities carrying `tid`. Tid 0 yields nothing.
    pub fn find_by_tid(&self, tid: i32) -> impl Iterator<Item = EntityId> + '_ {
        let set = if tid == NO_TID { None } else { self.tid_lookup.get(&tid) };
        set.into_iter().flat_map(|ids| ids.iter().copied())
    }

    /// Spawn points found during population.
    pub fn spawn_locations(&self) -> &SpawnLocations {
        &self.spawn_locations
    }

    /// Skill the map was populated with.
    pub fn skill(&self) -> SkillLevel {
        self.skill
    }

    /// Players in creation order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Player by number.
    pub fn player(&self, index: usize) -> Option<&Player> {
        self.players.iter().find(|p| p.index == index)
    }

    /// Player by number, mutably.
    pub fn player_mut(&mut self, index: usize) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.index == index)
    }

    // =========================================================================
    // Creation and destruction
    // =========================================================================

    /// Create an entity and link it into the world.
    ///
    /// The sector comes from the BSP. With a height hint the entity sits that
    /// far above the floor; without one, map entities sit on the floor and
    /// others keep the requested Z. Ceiling spawners hang from the ceiling.
    pub fn create(
        &mut self,
        geometry: &mut MapGeometry,
        physics: &mut PhysicsManager,
        request: SpawnRequest,
    ) -> Result<EntityId, EntityError> {
        let definition = self
            .definitions
            .get(request.definition)
            .ok_or(EntityError::UnknownDefinition(request.definition))?;

        let sector = &geometry.sectors[geometry.sector_at(request.position.xy())];
        let mut position = request.position;
        if z_height_set(request.z_hint) {
            position.z = sector.floor.z.saturating_add(request.z_hint);
        } else if request.is_map_init {
            position.z = sector.floor.z;
        }

        let id = EntityId(self.ids.next());
        let mut entity = Entity::new(id, request.definition, definition, position, request.angle, request.tid);
        let spawn_tics = definition.spawn_tics;

        physics.link_entity(geometry, self, &mut entity);

        if entity.flags.spawn_ceiling {
            let offset = if z_height_set(request.z_hint) { request.z_hint } else { 0 };
            let ceiling = geometry.sectors[entity.sector].ceiling.z;
            entity.position.z = ceiling.saturating_sub(entity.height).saturating_sub(offset);
        }

        entity.reset_interpolation();
        entity.state = ActorState::Spawn;
        entity.state_tics = spawn_tics;

        if entity.tid != NO_TID {
            self.tid_lookup.entry(entity.tid).or_default().insert(id);
        }
        self.list.push_back(id);
        self.store(entity);
        Ok(id)
    }

    fn store(&mut self, entity: Entity) {
        let index = entity.id.0 as usize;
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = Some(entity);
    }

    /// Remove an entity from the world. Returns false if it was not live.
    pub fn destroy(
        &mut self,
        geometry: &mut MapGeometry,
        physics: &mut PhysicsManager,
        id: EntityId,
    ) -> bool {
        let Some(entity) = self.slots.get_mut(id.0 as usize).and_then(Option::take) else {
            return false;
        };
        // Empty tid sets are kept for reuse
        if let Some(ids) = self.tid_lookup.get_mut(&entity.tid) {
            ids.remove(&id);
        }
        physics.unlink_entity(geometry, &entity);
        self.list.remove(id);
        self.ids.free(id.0);
        true
    }

    /// Put back an entity from a snapshot under its original id.
    pub fn restore_entity(
        &mut self,
        geometry: &mut MapGeometry,
        physics: &mut PhysicsManager,
        mut entity: Entity,
    ) {
        let id = entity.id;
        self.ids.reserve(id.0);
        let (position, prev_position) = (entity.position, entity.prev_position);
        physics.link_entity(geometry, self, &mut entity);
        entity.position = position;
        entity.prev_position = prev_position;
        if entity.tid != NO_TID {
            self.tid_lookup.entry(entity.tid).or_default().insert(id);
        }
        self.list.push_back(id);
        self.store(entity);
    }

    /// One past the highest entity id in use.
    pub fn id_high_water(&self) -> u32 {
        self.ids.high_water()
    }

    /// Put back a player from a snapshot.
    pub fn restore_player(&mut self, player: Player) {
        self.players.retain(|p| p.index != player.index);
        self.players.push(player);
    }

    /// Track a map entity as a possible spawn point.
    pub fn add_spawn_location(&mut self, id: EntityId) {
        let editor_id = self.definition_of(id).and_then(|def| def.editor_id);
        self.spawn_locations.add_possible_spawn_location(id, editor_id);
    }

    // =========================================================================
    // Map population
    // =========================================================================

    /// Whether a map thing appears at `skill` in single player.
    pub fn should_spawn(thing: &MapThing, skill: SkillLevel) -> bool {
        if !thing.flags.single_player {
            return false;
        }
        match skill {
            SkillLevel::VeryEasy | SkillLevel::Easy => thing.flags.easy,
            SkillLevel::Medium => thing.flags.medium,
            SkillLevel::Hard | SkillLevel::Nightmare => thing.flags.hard,
        }
    }

    /// Create every map thing that should appear at this skill.
    ///
    /// Returns the entities with an explicit height that are not bridges;
    /// they must go through [`EntityManager::relink_deferred`] once every map
    /// entity exists, so they settle on whatever they were placed on.
    pub fn populate_all(
        &mut self,
        geometry: &mut MapGeometry,
        physics: &mut PhysicsManager,
        map: &MapData,
    ) -> Vec<EntityId> {
        let mut relink = Vec::new();

        for thing in &map.things {
            if !Self::should_spawn(thing, self.skill) {
                continue;
            }

            let Some(definition) = self.definitions.id_by_editor_id(thing.editor_id) else {
                warn!(
                    editor_id = thing.editor_id,
                    x = thing.x,
                    y = thing.y,
                    "Cannot find entity by editor number"
                );
                continue;
            };

            let z_hint = thing.z.map_or(Z_HINT_UNSET, crate::core::fixed::from_int);
            let request = SpawnRequest {
                definition,
                position: FixedVec3::from_ints(thing.x, thing.y, 0),
                z_hint,
                angle: Angle::from_degrees(thing.angle),
                tid: thing.tid,
                is_map_init: true,
            };
            let id = match self.create(geometry, physics, request) {
                Ok(id) => id,
                Err(error) => {
                    warn!(%error, editor_id = thing.editor_id, "Skipping map thing");
                    continue;
                }
            };

            if let Some(entity) = self.get_mut(id) {
                entity.flags.ambush = thing.flags.ambush;
                if !entity.flags.act_like_bridge && z_height_set(z_hint) {
                    relink.push(id);
                }
            }
            self.add_spawn_location(id);
        }

        debug!(entities = self.len(), deferred = relink.len(), "Populated map entities");
        relink
    }

    /// Unlink and relink entities placed at explicit heights, now that every
    /// map entity exists, and reset their interpolation.
    pub fn relink_deferred(
        &mut self,
        geometry: &mut MapGeometry,
        physics: &mut PhysicsManager,
        ids: &[EntityId],
    ) {
        for &id in ids {
            let Some(mut entity) = self.slots.get_mut(id.0 as usize).and_then(Option::take) else {
                continue;
            };
            physics.unlink_entity(geometry, &entity);
            physics.link_entity(geometry, self, &mut entity);
            entity.reset_interpolation();
            self.store(entity);
        }
    }

    /// Populate the map: [`EntityManager::populate_all`] then
    /// [`EntityManager::relink_deferred`].
    pub fn populate_from(
        &mut self,
        geometry: &mut MapGeometry,
        physics: &mut PhysicsManager,
        map: &MapData,
    ) {
        let relink = self.populate_all(geometry, physics, map);
        self.relink_deferred(geometry, physics, &relink);
    }

    // =========================================================================
    // Players
    // =========================================================================

    /// Create player `index` at its spawn point with the default inventory.
    ///
    /// Without a spawn point the player appears at the origin. A player with
    /// the same number is replaced.
    pub fn create_player(
        &mut self,
        geometry: &mut MapGeometry,
        physics: &mut PhysicsManager,
        index: usize,
    ) -> Result<EntityId, EntityError> {
        let definition = self
            .definitions
            .id_by_name(PLAYER_CLASS)
            .ok_or(EntityError::MissingPlayerClass(PLAYER_CLASS))?;

        let spawn = self
            .spawn_locations
            .player_spawn(index)
            .and_then(|id| self.get(id))
            .map(|spot| (spot.position, spot.angle));
        let (position, angle) = spawn.unwrap_or_else(|| {
            warn!(player = index, "No player spawn found, creating player at origin");
            (FixedVec3::ZERO, Angle::EAST)
        });

        let request = SpawnRequest {
            definition,
            position: FixedVec3::new(position.x, position.y, 0),
            z_hint: Z_HINT_UNSET,
            angle,
            tid: NO_TID,
            is_map_init: true,
        };
        let id = self.create(geometry, physics, request)?;
        if let Some(body) = self.get_mut(id) {
            body.player = Some(index);
            body.flags.player = true;
        }

        let mut player = Player::new(index, id);
        if let Some(armor) = self.definitions.id_by_name("Armor") {
            if let Some(def) = self.definitions.get(armor) {
                player.inventory.add_placeholder(armor, def);
            }
        }
        self.players.retain(|p| p.index != index);
        self.players.push(player);

        self.give_weapon(index, "Fist");
        self.give_weapon(index, "Pistol");
        if let Some(player) = self.player_mut(index) {
            player.inventory.weapons.select("Pistol");
        }

        debug!(player = index, entity = %id, "Created player");
        Ok(id)
    }

    /// Give a weapon by class name plus the ammo it comes with. Returns
    /// whether anything was added.
    pub fn give_weapon(&mut self, player_index: usize, name: &str) -> bool {
        let Some(id) = self.definitions.id_by_name(name) else {
            warn!(player = player_index, weapon = name, "Missing weapon definition");
            return false;
        };
        self.give_item(player_index, id, 1)
    }

    /// Hand a player an item as if it was picked up. Returns whether the
    /// item should leave the world.
    pub fn give_item(&mut self, player_index: usize, id: DefinitionId, amount: i32) -> bool {
        let definitions = &self.definitions;
        let Some(definition) = definitions.get(id) else {
            return false;
        };
        let Some(props) = definition.item.as_ref() else {
            return false;
        };
        let Some(player) = self.players.iter_mut().find(|p| p.index == player_index) else {
            return false;
        };

        match props.kind {
            ItemKind::Health => {
                let Some(body) = self.slots.get_mut(player.entity.0 as usize).and_then(Option::as_mut) else {
                    return false;
                };
                if amount <= 0 || body.health >= props.max_amount {
                    return props.always_pickup;
                }
                body.health = body.health.saturating_add(amount).min(props.max_amount);
                true
            }
            ItemKind::Weapon => {
                let added = player.inventory.weapons.give(&definition.name, id);
                let ammo = props
                    .ammo_type
                    .as_deref()
                    .and_then(|name| definitions.id_by_name(name))
                    .and_then(|ammo_id| definitions.get(ammo_id).map(|def| (ammo_id, def)));
                let ammo_added = match ammo {
                    Some((ammo_id, ammo_def)) => player.inventory.add(ammo_id, ammo_def, props.ammo_give),
                    None => false,
                };
                added || ammo_added || props.always_pickup
            }
            ItemKind::Backpack => {
                let added = player.inventory.add(id, definition, amount);
                let mut seen = BTreeSet::new();
                for (ammo_id, ammo_def) in definitions.iter() {
                    let Some(ammo_props) = ammo_def.item.as_ref() else { continue };
                    if ammo_props.kind != ItemKind::Ammo || ammo_props.backpack_amount <= 0 {
                        continue;
                    }
                    if seen.insert(ammo_def.inventory_name().to_ascii_lowercase()) {
                        player.inventory.add(ammo_id, ammo_def, ammo_props.backpack_amount);
                    }
                }
                added
            }
            _ => player.inventory.add(id, definition, amount),
        }
    }

    // =========================================================================
    // Damage
    // =========================================================================

    /// Apply damage. Killing an entity starts its death state and makes it
    /// non-solid.
    pub fn damage(&mut self, id: EntityId, amount: i32) -> DamageOutcome {
        let invulnerable = self
            .get(id)
            .and_then(|entity| entity.player)
            .and_then(|index| self.player(index))
            .is_some_and(|player| player.inventory.is_powerup_active(PowerupType::Invulnerability));
        let death_tics = self.definition_of(id).map_or(0, |def| def.death_tics);

        let Some(entity) = self.get_mut(id) else {
            return DamageOutcome::Ignored;
        };
        if amount <= 0 || invulnerable || !entity.flags.shootable || !entity.is_alive() {
            return DamageOutcome::Ignored;
        }

        entity.health = entity.health.saturating_sub(amount);
        if entity.health > 0 {
            return DamageOutcome::Hurt { health: entity.health };
        }

        entity.health = 0;
        entity.flags.shootable = false;
        entity.flags.solid = false;
        if death_tics == 0 {
            entity.state = ActorState::Dead;
            entity.state_tics = 0;
        } else {
            entity.state = ActorState::Dying;
            entity.state_tics = death_tics;
        }
        DamageOutcome::Killed
    }
}
