//! Entity Definitions
//!
//! Static per-class data (size, health, flags, behavior, inventory
//! properties) looked up by name or by the editor number map things carry.
//! Definitions come from the definitions collaborator as JSON, or from the
//! built-in Doom set.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

/// Class name of the player entity.
pub const PLAYER_CLASS: &str = "DoomPlayer";

/// Index into the [`DefinitionRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionId(pub usize);

/// Behavior flags shared by definitions and live entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityFlags {
    /// Blocks other solid movers
    pub solid: bool,
    /// Can take damage
    pub shootable: bool,
    /// Not pulled down by gravity
    pub no_gravity: bool,
    /// Spawns hanging from the ceiling
    pub spawn_ceiling: bool,
    /// Other entities can stand on top of it
    pub act_like_bridge: bool,
    /// Flies straight and explodes on impact
    pub missile: bool,
    /// Counts as a monster for line blocking and drop-off checks
    pub monster: bool,
    /// Picked up when a player touches it
    pub pickup: bool,
    /// Not linked into the blockmap (invisible to collision)
    pub no_blockmap: bool,
    /// Set on player bodies
    pub player: bool,
    /// Authored "ambush" map flag
    pub ambush: bool,
}

/// What an entity does on its own each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Sits still
    #[default]
    Decoration,
    /// Driven by tick commands
    Player,
    /// Marks where players spawn
    PlayerStart,
    /// Wanders around once awake
    Monster,
    /// Flies along its velocity
    Projectile,
    /// Waits to be picked up
    Item,
    /// Target of teleport specials
    TeleportDestination,
}

/// Inventory category of an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Restores the owner's health
    Health,
    /// Armor points
    Armor,
    /// Ammunition
    Ammo,
    /// A weapon
    Weapon,
    /// Door key
    Key,
    /// Raises ammo limits
    Backpack,
    /// Timed effect
    Powerup,
}

/// Timed powerup effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupType {
    /// Ignores all damage
    Invulnerability,
    /// Radiation suit
    IronFeet,
}

/// Inventory properties of item definitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProps {
    /// Category
    pub kind: ItemKind,
    /// Amount given on pickup
    #[serde(default = "default_amount")]
    pub amount: i32,
    /// Most the owner can carry
    #[serde(default = "default_amount")]
    pub max_amount: i32,
    /// Carry limit once a backpack is owned (ammo only)
    #[serde(default)]
    pub backpack_max_amount: i32,
    /// Amount a backpack gives (ammo only)
    #[serde(default)]
    pub backpack_amount: i32,
    /// Removed from the world even when the owner is already full
    #[serde(default)]
    pub always_pickup: bool,
    /// Inventory slot name when several definitions share one (armor types)
    #[serde(default)]
    pub base: Option<String>,
    /// Ammo class used by a weapon
    #[serde(default)]
    pub ammo_type: Option<String>,
    /// Ammo a weapon comes with
    #[serde(default)]
    pub ammo_give: i32,
    /// Effect of a powerup
    #[serde(default)]
    pub powerup: Option<PowerupType>,
    /// Powerup duration in ticks
    #[serde(default)]
    pub duration: u32,
    /// Sound played on pickup
    #[serde(default)]
    pub pickup_sound: Option<String>,
}

fn default_amount() -> i32 {
    1
}

impl ItemProps {
    fn new(kind: ItemKind, amount: i32, max_amount: i32) -> Self {
        Self {
            kind,
            amount,
            max_amount,
            backpack_max_amount: 0,
            backpack_amount: 0,
            always_pickup: false,
            base: None,
            ammo_type: None,
            ammo_give: 0,
            powerup: None,
            duration: 0,
            pickup_sound: None,
        }
    }
}

/// Static data shared by every entity of one class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Class name (unique, case-insensitive)
    pub name: String,
    /// Editor number used by map things
    #[serde(default)]
    pub editor_id: Option<u16>,
    /// Collision radius in map units
    #[serde(default = "default_radius")]
    pub radius: i32,
    /// Height in map units
    #[serde(default = "default_height")]
    pub height: i32,
    /// Movement speed in map units per tick
    #[serde(default)]
    pub speed: i32,
    /// Spawn health
    #[serde(default = "default_health")]
    pub health: i32,
    /// Damage dealt on impact (projectiles)
    #[serde(default)]
    pub damage: i32,
    /// Behavior flags
    #[serde(default)]
    pub flags: EntityFlags,
    /// Per-tick behavior
    #[serde(default)]
    pub behavior: Behavior,
    /// Ticks spent in the spawn state before waking up
    #[serde(default)]
    pub spawn_tics: u32,
    /// Ticks spent dying before becoming a corpse
    #[serde(default)]
    pub death_tics: u32,
    /// Sound played on death
    #[serde(default)]
    pub death_sound: Option<String>,
    /// Inventory properties, for items
    #[serde(default)]
    pub item: Option<ItemProps>,
}

fn default_radius() -> i32 {
    20
}

fn default_height() -> i32 {
    16
}

fn default_health() -> i32 {
    1000
}

impl EntityDefinition {
    /// A plain decoration definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            editor_id: None,
            radius: default_radius(),
            height: default_height(),
            speed: 0,
            health: default_health(),
            damage: 0,
            flags: EntityFlags::default(),
            behavior: Behavior::Decoration,
            spawn_tics: 0,
            death_tics: 0,
            death_sound: None,
            item: None,
        }
    }

    fn editor_id(mut self, id: u16) -> Self {
        self.editor_id = Some(id);
        self
    }

    fn size(mut self, radius: i32, height: i32) -> Self {
        self.radius = radius;
        self.height = height;
        self
    }

    fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn flags(mut self, flags: EntityFlags) -> Self {
        self.flags = flags;
        self
    }

    fn item(mut self, item: ItemProps) -> Self {
        self.behavior = Behavior::Item;
        self.flags.pickup = true;
        self.item = Some(item);
        self
    }

    fn monster(self, health: i32, speed: i32, death_sound: &str) -> Self {
        Self {
            health,
            speed,
            behavior: Behavior::Monster,
            flags: EntityFlags { solid: true, shootable: true, monster: true, ..EntityFlags::default() },
            spawn_tics: 10,
            death_tics: 30,
            death_sound: Some(death_sound.to_string()),
            ..self
        }
    }

    /// Inventory slot name: the item's base name, else the class name.
    pub fn inventory_name(&self) -> &str {
        self.item
            .as_ref()
            .and_then(|item| item.base.as_deref())
            .unwrap_or(&self.name)
    }

    /// True if this definition is an item of `kind`.
    pub fn is_item_kind(&self, kind: ItemKind) -> bool {
        self.item.as_ref().is_some_and(|item| item.kind == kind)
    }
}

/// Definitions by id, case-insensitive name and editor number.
#[derive(Clone, Debug, Default)]
pub struct DefinitionRegistry {
    definitions: Vec<EntityDefinition>,
    by_name: HashMap<String, DefinitionId>,
    by_editor_id: HashMap<u16, DefinitionId>,
}

impl DefinitionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. A later definition with the same name or editor
    /// number replaces the earlier one for lookups.
    pub fn register(&mut self, definition: EntityDefinition) -> DefinitionId {
        let id = DefinitionId(self.definitions.len());
        self.by_name.insert(definition.name.to_ascii_lowercase(), id);
        if let Some(editor_id) = definition.editor_id {
            self.by_editor_id.insert(editor_id, id);
        }
        self.definitions.push(definition);
        id
    }

    /// Parse a JSON array of definitions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut registry = Self::new();
        registry.extend_from_json(json)?;
        Ok(registry)
    }

    /// Register every definition of a JSON array, overriding existing ones.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let definitions: Vec<EntityDefinition> = serde_json::from_str(json)?;
        let count = definitions.len();
        for definition in definitions {
            self.register(definition);
        }
        Ok(count)
    }

    /// Definition by id.
    pub fn get(&self, id: DefinitionId) -> Option<&EntityDefinition> {
        self.definitions.get(id.0)
    }

    /// Id by case-insensitive class name.
    pub fn id_by_name(&self, name: &str) -> Option<DefinitionId> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    /// Definition by case-insensitive class name.
    pub fn by_name(&self, name: &str) -> Option<&EntityDefinition> {
        self.id_by_name(name).and_then(|id| self.get(id))
    }

    /// Id by editor number.
    pub fn id_by_editor_id(&self, editor_id: u16) -> Option<DefinitionId> {
        self.by_editor_id.get(&editor_id).copied()
    }

    /// All definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (DefinitionId, &EntityDefinition)> {
        self.definitions.iter().enumerate().map(|(i, def)| (DefinitionId(i), def))
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The built-in Doom classes the demo maps and tests use.
    pub fn doom_defaults() -> Self {
        let mut registry = Self::new();
        for definition in doom_definitions() {
            registry.register(definition);
        }
        registry
    }
}

fn doom_definitions() -> Vec<EntityDefinition> {
    let player = EntityDefinition {
        health: 100,
        speed: 1,
        ..EntityDefinition::new(PLAYER_CLASS)
    }
    .size(16, 56)
    .behavior(Behavior::Player)
    .flags(EntityFlags { solid: true, shootable: true, player: true, ..EntityFlags::default() });
    let mut defs = vec![player];

    // Player starts; 4001-4004 are starts 5-8
    let starts = (1..=4u16).map(|n| (n, n)).chain((4001..=4004u16).map(|id| (id, id - 3996)));
    for (editor_id, number) in starts {
        defs.push(
            EntityDefinition::new(format!("Player{}Start", number))
                .editor_id(editor_id)
                .behavior(Behavior::PlayerStart)
                .flags(EntityFlags { no_blockmap: true, ..EntityFlags::default() }),
        );
    }
    defs.push(
        EntityDefinition::new("DeathmatchStart")
            .editor_id(11)
            .behavior(Behavior::PlayerStart)
            .flags(EntityFlags { no_blockmap: true, ..EntityFlags::default() }),
    );
    defs.push(
        EntityDefinition::new("TeleportDest")
            .editor_id(14)
            .behavior(Behavior::TeleportDestination)
            .flags(EntityFlags { no_blockmap: true, no_gravity: true, ..EntityFlags::default() }),
    );

    defs.push(EntityDefinition::new("ZombieMan").editor_id(3004).size(20, 56).monster(20, 8, "grunt/death"));
    defs.push(EntityDefinition::new("DoomImp").editor_id(3001).size(20, 56).monster(60, 8, "imp/death"));
    defs.push(EntityDefinition::new("Demon").editor_id(3002).size(30, 56).monster(150, 10, "demon/death"));
    defs.push(
        EntityDefinition {
            health: 20,
            death_tics: 20,
            death_sound: Some("world/barrelx".to_string()),
            ..EntityDefinition::new("ExplosiveBarrel")
        }
        .editor_id(2035)
        .size(10, 42)
        .flags(EntityFlags { solid: true, shootable: true, ..EntityFlags::default() }),
    );
    defs.push(EntityDefinition {
        speed: 10,
        damage: 3,
        flags: EntityFlags { missile: true, no_gravity: true, ..EntityFlags::default() },
        behavior: Behavior::Projectile,
        death_sound: Some("imp/shotx".to_string()),
        ..EntityDefinition::new("DoomImpBall").size(6, 8)
    });

    // Ammo
    let ammo = |name: &str, editor_id: u16, amount: i32, max: i32| {
        let mut props = ItemProps::new(ItemKind::Ammo, amount, max);
        props.backpack_amount = amount;
        props.backpack_max_amount = max * 2;
        props.pickup_sound = Some("misc/ammo_pkup".to_string());
        EntityDefinition::new(name).editor_id(editor_id).item(props)
    };
    defs.push(ammo("Clip", 2007, 10, 200));
    defs.push(ammo("Shell", 2008, 4, 50));

    // Health and armor
    let mut bonus = ItemProps::new(ItemKind::Health, 1, 200);
    bonus.always_pickup = true;
    bonus.pickup_sound = Some("misc/health_pkup".to_string());
    defs.push(EntityDefinition::new("HealthBonus").editor_id(2014).item(bonus));

    let mut stimpack = ItemProps::new(ItemKind::Health, 10, 100);
    stimpack.pickup_sound = Some("misc/health_pkup".to_string());
    defs.push(EntityDefinition::new("Stimpack").editor_id(2011).item(stimpack));

    let mut armor = ItemProps::new(ItemKind::Armor, 0, 200);
    armor.base = Some("Armor".to_string());
    defs.push(EntityDefinition::new("Armor").item(armor));

    let mut green = ItemProps::new(ItemKind::Armor, 100, 100);
    green.base = Some("Armor".to_string());
    green.pickup_sound = Some("misc/armor_pkup".to_string());
    defs.push(EntityDefinition::new("GreenArmor").editor_id(2018).item(green));

    let mut backpack = ItemProps::new(ItemKind::Backpack, 1, 1);
    backpack.always_pickup = true;
    backpack.pickup_sound = Some("misc/ammo_pkup".to_string());
    defs.push(EntityDefinition::new("Backpack").editor_id(8).item(backpack));

    // Keys
    for (name, editor_id) in [("BlueCard", 5u16), ("YellowCard", 6), ("RedCard", 13)] {
        let mut key = ItemProps::new(ItemKind::Key, 1, 1);
        key.pickup_sound = Some("misc/k_pkup".to_string());
        defs.push(EntityDefinition::new(name).editor_id(editor_id).item(key));
    }

    // Powerups
    let powerup = |name: &str, editor_id: u16, kind: PowerupType, duration: u32| {
        let mut props = ItemProps::new(ItemKind::Powerup, 1, 1);
        props.always_pickup = true;
        props.powerup = Some(kind);
        props.duration = duration;
        props.pickup_sound = Some("misc/p_pkup".to_string());
        EntityDefinition::new(name).editor_id(editor_id).item(props)
    };
    defs.push(powerup("InvulnerabilitySphere", 2022, PowerupType::Invulnerability, 30 * crate::TICK_RATE));
    defs.push(powerup("RadSuit", 2025, PowerupType::IronFeet, 60 * crate::TICK_RATE));

    // Weapons
    let weapon = |name: &str, ammo_type: Option<&str>, ammo_give: i32| {
        let mut props = ItemProps::new(ItemKind::Weapon, 1, 1);
        props.ammo_type = ammo_type.map(str::to_string);
        props.ammo_give = ammo_give;
        props.pickup_sound = Some("misc/w_pkup".to_string());
        EntityDefinition::new(name).item(props)
    };
    defs.push(weapon("Fist", None, 0));
    defs.push(weapon("Pistol", Some("Clip"), 20));
    defs.push(weapon("Shotgun", Some("Shell"), 8).editor_id(2001));

    defs
}
