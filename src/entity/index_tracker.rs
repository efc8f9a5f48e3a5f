//! Dense reusable id pool.

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};

/// Hands out the lowest free index, so ids stay dense as entities come and go.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableIndexTracker {
    /// One past the highest index ever handed out
    next: u32,
    /// Freed indices below `next`
    free: BTreeSet<u32>,
}

impl AvailableIndexTracker {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lowest available index.
    pub fn next(&mut self) -> u32 {
        if let Some(index) = self.free.pop_first() {
            return index;
        }
        let index = self.next;
        self.next += 1;
        index
    }

    /// Mark a specific index as used (snapshot restore).
    pub fn reserve(&mut self, index: u32) {
        if index >= self.next {
            self.free.extend(self.next..index);
            self.next = index + 1;
        } else {
            self.free.remove(&index);
        }
    }

    /// Return an index to the pool. Freeing an unused index is a no-op.
    pub fn free(&mut self, index: u32) {
        if index >= self.next {
            return;
        }
        if index + 1 == self.next {
            self.next -= 1;
            // Collapse trailing free indices
            while self.next > 0 && self.free.remove(&(self.next - 1)) {
                self.next -= 1;
            }
        } else {
            self.free.insert(index);
        }
    }

    /// One past the highest index handed out.
    pub fn high_water(&self) -> u32 {
        self.next
    }

    /// Whether `index` is currently handed out.
    pub fn is_used(&self, index: u32) -> bool {
        index < self.next && !self.free.contains(&index)
    }

    /// Number of indices handed out.
    pub fn len(&self) -> usize {
        self.next as usize - self.free.len()
    }

    /// True if nothing is handed out.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lowest_free_first() {
        let mut tracker = AvailableIndexTracker::new();
        assert_eq!(tracker.next(), 0);
        assert_eq!(tracker.next(), 1);
        assert_eq!(tracker.next(), 2);

        tracker.free(1);
        tracker.free(0);
        assert_eq!(tracker.next(), 0);
        assert_eq!(tracker.next(), 1);
        assert_eq!(tracker.next(), 3);
    }

    #[test]
    fn test_freeing_tail_shrinks_pool() {
        let mut tracker = AvailableIndexTracker::new();
        for _ in 0..4 {
            tracker.next();
        }
        tracker.free(2);
        tracker.free(3);
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.high_water(), 2);
        assert_eq!(tracker.next(), 2);
    }

    #[test]
    fn test_reserve() {
        let mut tracker = AvailableIndexTracker::new();
        tracker.reserve(3);
        assert!(tracker.is_used(3));
        assert!(!tracker.is_used(1));
        assert_eq!(tracker.next(), 0);
        tracker.reserve(1);
        assert_eq!(tracker.next(), 2);
        assert_eq!(tracker.next(), 4);
    }

    proptest! {
        #[test]
        fn prop_ids_are_unique_and_dense(ops in proptest::collection::vec(any::<bool>(), 1..200)) {
            let mut tracker = AvailableIndexTracker::new();
            let mut live: BTreeSet<u32> = BTreeSet::new();

            for take in ops {
                if take || live.is_empty() {
                    let id = tracker.next();
                    prop_assert!(live.insert(id), "id {} handed out twice", id);
                } else {
                    let id = *live.iter().next().unwrap();
                    live.remove(&id);
                    tracker.free(id);
                }
                prop_assert_eq!(tracker.len(), live.len());
            }

            // The next id is the smallest one not in use
            let expected = (0..).find(|i| !live.contains(i)).unwrap();
            prop_assert_eq!(tracker.next(), expected);
        }
    }
}
