//! Global entity list.
//!
//! A doubly linked list stored in a `BTreeMap` keyed by [`EntityId`].
//! Entities tick in creation order. Append, removal and neighbour lookup
//! are O(log n), and removing the entry being visited does not disturb a
//! walk that fetched its successor first.

use std::collections::BTreeMap;

use super::EntityId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Node {
    prev: Option<EntityId>,
    next: Option<EntityId>,
}

/// Ordered set of entity ids with logarithmic append and removal.
#[derive(Clone, Debug, Default)]
pub struct EntityList {
    nodes: BTreeMap<EntityId, Node>,
    head: Option<EntityId>,
    tail: Option<EntityId>,
}

impl EntityList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id`. Returns false if it is already a member.
    pub fn push_back(&mut self, id: EntityId) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        let node = Node { prev: self.tail, next: None };
        match self.tail {
            Some(tail) => {
                if let Some(tail_node) = self.nodes.get_mut(&tail) {
                    tail_node.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.nodes.insert(id, node);
        true
    }

    /// Unlink `id`. Returns false if it was not a member.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        match node.prev {
            Some(prev) => {
                if let Some(prev_node) = self.nodes.get_mut(&prev) {
                    prev_node.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(next_node) = self.nodes.get_mut(&next) {
                    next_node.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
        true
    }

    /// Whether `id` is in the list.
    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// First member.
    pub fn first(&self) -> Option<EntityId> {
        self.head
    }

    /// Member after `id`.
    pub fn next_of(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(&id).and_then(|node| node.next)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Members in list order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        std::iter::successors(self.head, move |&id| self.next_of(id))
    }

    /// Drop every member.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }
}
