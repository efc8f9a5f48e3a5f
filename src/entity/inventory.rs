//! Player Inventory
//!
//! Items are keyed by their case-insensitive inventory name. Keys keep a
//! separate list sorted by editor number (the order a HUD draws them), weapons
//! live in their own ordered set, and powerups count down every tick.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use super::definition::{DefinitionId, EntityDefinition, ItemKind, PowerupType};

/// A stack of one item kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Inventory name as authored
    pub name: String,
    /// Definition the item was first added from
    pub definition: DefinitionId,
    /// Category
    pub kind: ItemKind,
    /// Editor number of the definition (key sort order)
    pub editor_id: Option<u16>,
    /// Amount held
    pub amount: i32,
}

/// An active timed powerup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Powerup {
    /// Effect
    pub kind: PowerupType,
    /// Inventory name of the item that granted it
    pub item: String,
    /// Full duration in ticks
    pub duration: u32,
    /// Ticks left
    pub tics_remaining: u32,
}

/// Result of ticking a powerup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InventoryTickStatus {
    /// Still running
    Continue,
    /// Expired
    Destroy,
}

impl Powerup {
    /// Count down one tick.
    pub fn tick(&mut self) -> InventoryTickStatus {
        self.tics_remaining = self.tics_remaining.saturating_sub(1);
        if self.tics_remaining == 0 {
            InventoryTickStatus::Destroy
        } else {
            InventoryTickStatus::Continue
        }
    }

    /// Restart the countdown.
    pub fn reset(&mut self) {
        self.tics_remaining = self.duration;
    }
}

/// Owned weapons in pickup order, plus the selected one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapons {
    owned: Vec<(String, DefinitionId)>,
    selected: Option<String>,
}

impl Weapons {
    /// Add a weapon. Returns false if it was already owned.
    pub fn give(&mut self, name: &str, definition: DefinitionId) -> bool {
        if self.has(name) {
            return false;
        }
        self.owned.push((name.to_string(), definition));
        true
    }

    /// Whether the weapon is owned.
    pub fn has(&self, name: &str) -> bool {
        self.owned.iter().any(|(owned, _)| owned.eq_ignore_ascii_case(name))
    }

    /// Drop a weapon, deselecting it if needed.
    pub fn remove(&mut self, name: &str) {
        self.owned.retain(|(owned, _)| !owned.eq_ignore_ascii_case(name));
        if self.selected.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(name)) {
            self.selected = None;
        }
    }

    /// Select an owned weapon. Returns false if it is not owned.
    pub fn select(&mut self, name: &str) -> bool {
        match self.owned.iter().find(|(owned, _)| owned.eq_ignore_ascii_case(name)) {
            Some((owned, _)) => {
                self.selected = Some(owned.clone());
                true
            }
            None => false,
        }
    }

    /// Selected weapon name.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Owned weapon names in pickup order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.owned.iter().map(|(name, _)| name.as_str())
    }

    /// Number of owned weapons.
    pub fn len(&self) -> usize {
        self.owned.len()
    }

    /// True if no weapon is owned.
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }
}

/// Everything a player carries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<String, InventoryItem>,
    keys: Vec<String>,
    /// Owned weapons
    pub weapons: Weapons,
    powerups: Vec<Powerup>,
}

fn key_of(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` of an item.
    ///
    /// Returns whether the item should be removed from the world: true when
    /// anything was added, otherwise the item's `always_pickup` flag (keys
    /// already held, or items already at their limit).
    pub fn add(&mut self, id: DefinitionId, definition: &EntityDefinition, amount: i32) -> bool {
        let Some(props) = definition.item.as_ref() else {
            return false;
        };
        if amount <= 0 {
            return false;
        }

        if let (ItemKind::Powerup, Some(kind)) = (props.kind, props.powerup) {
            self.add_powerup(kind, definition.inventory_name(), props.duration);
        }

        let mut max_amount = props.max_amount;
        if props.kind == ItemKind::Ammo
            && self.has_item_of_kind(ItemKind::Backpack)
            && props.backpack_max_amount > max_amount
        {
            max_amount = props.backpack_max_amount;
        }

        let is_key = props.kind == ItemKind::Key;
        let name = definition.inventory_name();

        if let Some(item) = self.items.get_mut(&key_of(name)) {
            if is_key || item.amount >= max_amount {
                return props.always_pickup;
            }
            item.amount = item.amount.saturating_add(amount).min(max_amount);
            return true;
        }

        self.items.insert(
            key_of(name),
            InventoryItem {
                name: name.to_string(),
                definition: id,
                kind: props.kind,
                editor_id: definition.editor_id,
                amount: if is_key { 1 } else { amount.min(max_amount.max(1)) },
            },
        );
        if is_key {
            self.keys.push(key_of(name));
            self.sort_keys();
        }
        true
    }

    /// Insert an empty slot so the item shows with amount zero.
    pub fn add_placeholder(&mut self, id: DefinitionId, definition: &EntityDefinition) {
        let Some(props) = definition.item.as_ref() else {
            return;
        };
        let name = definition.inventory_name();
        self.items.entry(key_of(name)).or_insert_with(|| InventoryItem {
            name: name.to_string(),
            definition: id,
            kind: props.kind,
            editor_id: definition.editor_id,
            amount: 0,
        });
    }

    fn add_powerup(&mut self, kind: PowerupType, item: &str, duration: u32) {
        if let Some(existing) = self.powerups.iter_mut().find(|p| p.kind == kind) {
            existing.reset();
            return;
        }
        self.powerups.push(Powerup {
            kind,
            item: item.to_string(),
            duration,
            tics_remaining: duration,
        });
    }

    /// Take `amount` of an item away, removing the slot when it runs out.
    /// Names that are not items are tried as weapons.
    pub fn remove(&mut self, name: &str, amount: i32) {
        if amount <= 0 {
            return;
        }
        let key = key_of(name);
        if let Some(item) = self.items.get_mut(&key) {
            let is_key = item.kind == ItemKind::Key;
            if amount < item.amount {
                item.amount -= amount;
            } else {
                self.items.remove(&key);
            }
            if is_key {
                self.keys.retain(|k| *k != key);
                self.sort_keys();
            }
            return;
        }
        self.weapons.remove(name);
    }

    /// Drop an item slot entirely.
    pub fn remove_all(&mut self, name: &str) {
        let key = key_of(name);
        self.items.remove(&key);
        self.keys.retain(|k| *k != key);
    }

    /// Count down powerups, removing expired ones and their items.
    pub fn tick(&mut self) {
        let mut expired = Vec::new();
        self.powerups.retain_mut(|powerup| match powerup.tick() {
            InventoryTickStatus::Continue => true,
            InventoryTickStatus::Destroy => {
                expired.push(powerup.item.clone());
                false
            }
        });
        for item in expired {
            self.remove(&item, 1);
        }
    }

    /// Whether an item slot exists.
    pub fn has_item(&self, name: &str) -> bool {
        self.items.contains_key(&key_of(name))
    }

    /// Whether any held item is of `kind`.
    pub fn has_item_of_kind(&self, kind: ItemKind) -> bool {
        self.items.values().any(|item| item.kind == kind)
    }

    /// Amount held, zero when absent.
    pub fn amount(&self, name: &str) -> i32 {
        self.items.get(&key_of(name)).map_or(0, |item| item.amount)
    }

    /// Held items in name order.
    pub fn items(&self) -> impl Iterator<Item = &InventoryItem> {
        self.items.values()
    }

    /// Held keys sorted by editor number.
    pub fn keys(&self) -> Vec<&InventoryItem> {
        self.keys.iter().filter_map(|key| self.items.get(key)).collect()
    }

    /// Active powerups.
    pub fn powerups(&self) -> &[Powerup] {
        &self.powerups
    }

    /// Whether a powerup of `kind` is running.
    pub fn is_powerup_active(&self, kind: PowerupType) -> bool {
        self.powerups.iter().any(|p| p.kind == kind)
    }

    /// Drop all keys.
    pub fn clear_keys(&mut self) {
        for key in std::mem::take(&mut self.keys) {
            self.items.remove(&key);
        }
    }

    /// Drop all items and keys. Weapons are kept.
    pub fn clear(&mut self) {
        self.items.clear();
        self.keys.clear();
    }

    fn sort_keys(&mut self) {
        let items = &self.items;
        self.keys
            .sort_by_key(|key| items.get(key).and_then(|item| item.editor_id).unwrap_or(u16::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::definition::DefinitionRegistry;

    fn registry() -> DefinitionRegistry {
        DefinitionRegistry::doom_defaults()
    }

    fn add(inventory: &mut Inventory, registry: &DefinitionRegistry, name: &str, amount: i32) -> bool {
        let id = registry.id_by_name(name).unwrap();
        inventory.add(id, registry.get(id).unwrap(), amount)
    }

    #[test]
    fn test_add_clamps_to_max() {
        let registry = registry();
        let mut inventory = Inventory::new();
        assert!(add(&mut inventory, &registry, "Clip", 10));
        assert!(add(&mut inventory, &registry, "clip", 500));
        assert_eq!(inventory.amount("CLIP"), 200);

        // Full and not always-pickup: stays in the world
        assert!(!add(&mut inventory, &registry, "Clip", 10));
        assert!(!add(&mut inventory, &registry, "Clip", 0));
    }

    #[test]
    fn test_backpack_raises_ammo_limit() {
        let registry = registry();
        let mut inventory = Inventory::new();
        add(&mut inventory, &registry, "Shell", 50);
        assert!(!add(&mut inventory, &registry, "Shell", 4));

        assert!(add(&mut inventory, &registry, "Backpack", 1));
        assert!(add(&mut inventory, &registry, "Shell", 4));
        assert_eq!(inventory.amount("Shell"), 54);

        // A second backpack is still taken out of the world
        assert!(add(&mut inventory, &registry, "Backpack", 1));
    }

    #[test]
    fn test_keys_sorted_by_editor_id() {
        let registry = registry();
        let mut inventory = Inventory::new();
        add(&mut inventory, &registry, "RedCard", 1);
        add(&mut inventory, &registry, "BlueCard", 1);
        add(&mut inventory, &registry, "YellowCard", 1);
        let names: Vec<_> = inventory.keys().iter().map(|k| k.name.clone()).collect();
        assert_eq!(names, vec!["BlueCard", "YellowCard", "RedCard"]);

        // Keys already held are never added twice
        assert!(!add(&mut inventory, &registry, "BlueCard", 1));
        assert_eq!(inventory.amount("BlueCard"), 1);

        inventory.remove("YellowCard", 1);
        assert_eq!(inventory.keys().len(), 2);
        inventory.clear_keys();
        assert!(inventory.keys().is_empty());
        assert!(!inventory.has_item("RedCard"));
    }

    #[test]
    fn test_shared_base_name() {
        let registry = registry();
        let mut inventory = Inventory::new();
        let armor = registry.id_by_name("Armor").unwrap();
        inventory.add_placeholder(armor, registry.get(armor).unwrap());
        assert!(inventory.has_item("Armor"));
        assert_eq!(inventory.amount("Armor"), 0);

        assert!(add(&mut inventory, &registry, "GreenArmor", 100));
        assert_eq!(inventory.amount("Armor"), 100);
        assert!(!add(&mut inventory, &registry, "GreenArmor", 100));
    }

    #[test]
    fn test_remove_falls_back_to_weapons() {
        let registry = registry();
        let mut inventory = Inventory::new();
        inventory.weapons.give("Pistol", registry.id_by_name("Pistol").unwrap());
        inventory.weapons.select("pistol");
        assert_eq!(inventory.weapons.selected(), Some("Pistol"));

        add(&mut inventory, &registry, "Clip", 30);
        inventory.remove("Clip", 10);
        assert_eq!(inventory.amount("Clip"), 20);
        inventory.remove("Clip", 20);
        assert!(!inventory.has_item("Clip"));

        inventory.remove("Pistol", 1);
        assert!(!inventory.weapons.has("Pistol"));
        assert_eq!(inventory.weapons.selected(), None);
    }

    #[test]
    fn test_powerup_expires() {
        let registry = registry();
        let mut inventory = Inventory::new();
        assert!(add(&mut inventory, &registry, "InvulnerabilitySphere", 1));
        assert!(inventory.is_powerup_active(PowerupType::Invulnerability));
        let duration = inventory.powerups()[0].duration;

        for _ in 0..duration - 1 {
            inventory.tick();
        }
        assert!(inventory.is_powerup_active(PowerupType::Invulnerability));

        // Picking up another sphere restarts the countdown
        assert!(add(&mut inventory, &registry, "InvulnerabilitySphere", 1));
        assert_eq!(inventory.powerups()[0].tics_remaining, duration);

        for _ in 0..duration {
            inventory.tick();
        }
        assert!(!inventory.is_powerup_active(PowerupType::Invulnerability));
        assert!(!inventory.has_item("InvulnerabilitySphere"));
    }
}
