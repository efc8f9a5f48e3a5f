//! Player spawn points collected during map population.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use super::EntityId;

/// Editor number of deathmatch starts.
pub const DEATHMATCH_START: u16 = 11;

/// Player index a start editor number spawns, if it is a player start.
///
/// Starts 1-4 are players 0-3; 4001-4004 are players 4-7.
pub fn player_start_index(editor_id: u16) -> Option<usize> {
    match editor_id {
        1..=4 => Some(editor_id as usize - 1),
        4001..=4004 => Some(editor_id as usize - 3997),
        _ => None,
    }
}

/// Every spawn entity of the map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnLocations {
    player_starts: BTreeMap<usize, Vec<EntityId>>,
    deathmatch_starts: Vec<EntityId>,
}

impl SpawnLocations {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `entity` if its editor number marks a spawn point.
    pub fn add_possible_spawn_location(&mut self, entity: EntityId, editor_id: Option<u16>) {
        let Some(editor_id) = editor_id else {
            return;
        };
        if let Some(index) = player_start_index(editor_id) {
            let spawns = self.player_starts.entry(index).or_default();
            if !spawns.contains(&entity) {
                spawns.push(entity);
            }
        } else if editor_id == DEATHMATCH_START && !self.deathmatch_starts.contains(&entity) {
            self.deathmatch_starts.push(entity);
        }
    }

    /// Spawn point for a zero-based player index. The last one added wins.
    pub fn player_spawn(&self, player_index: usize) -> Option<EntityId> {
        self.player_starts.get(&player_index).and_then(|spawns| spawns.last().copied())
    }

    /// Deathmatch starts in map order.
    pub fn deathmatch_starts(&self) -> &[EntityId] {
        &self.deathmatch_starts
    }

    /// Forget a destroyed spawn entity.
    pub fn remove(&mut self, entity: EntityId) {
        for spawns in self.player_starts.values_mut() {
            spawns.retain(|&id| id != entity);
        }
        self.deathmatch_starts.retain(|&id| id != entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_indices() {
        assert_eq!(player_start_index(1), Some(0));
        assert_eq!(player_start_index(4), Some(3));
        assert_eq!(player_start_index(4001), Some(4));
        assert_eq!(player_start_index(4004), Some(7));
        assert_eq!(player_start_index(11), None);
        assert_eq!(player_start_index(3001), None);
    }

    #[test]
    fn test_last_added_wins() {
        let mut spawns = SpawnLocations::new();
        spawns.add_possible_spawn_location(EntityId(0), Some(1));
        spawns.add_possible_spawn_location(EntityId(5), Some(1));
        spawns.add_possible_spawn_location(EntityId(6), Some(4002));
        spawns.add_possible_spawn_location(EntityId(7), Some(11));
        spawns.add_possible_spawn_location(EntityId(8), Some(3001));
        spawns.add_possible_spawn_location(EntityId(9), None);

        assert_eq!(spawns.player_spawn(0), Some(EntityId(5)));
        assert_eq!(spawns.player_spawn(5), Some(EntityId(6)));
        assert_eq!(spawns.player_spawn(1), None);
        assert_eq!(spawns.deathmatch_starts(), &[EntityId(7)]);

        spawns.remove(EntityId(5));
        assert_eq!(spawns.player_spawn(0), Some(EntityId(0)));
    }
}
