//! Loot items scattered on the map and the dog's bag

use serde::{Deserialize, Serialize};

use crate::geometry::Position;

/// Loot identifier, allocated monotonically within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LootId(pub u64);

/// A scattered item waiting to be picked up
#[derive(Debug, Clone, PartialEq)]
pub struct Loot {
    id: LootId,
    position: Position,
    type_index: usize,
}

impl Loot {
    pub fn new(id: LootId, position: Position, type_index: usize) -> Self {
        Loot {
            id,
            position,
            type_index,
        }
    }

    pub fn id(&self) -> LootId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn type_index(&self) -> usize {
        self.type_index
    }
}

/// Bag entry: a picked-up loot id and its type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagItem {
    pub id: LootId,
    pub type_index: usize,
}

/// Ordered fixed-capacity container for picked-up loot
#[derive(Debug, Clone, PartialEq)]
pub struct Bag {
    items: Vec<BagItem>,
    capacity: usize,
}

impl Bag {
    pub fn new(capacity: usize) -> Self {
        Bag {
            items: Vec::new(),
            capacity,
        }
    }

    /// Rebuilds a bag from persisted contents
    pub fn restore(capacity: usize, items: Vec<BagItem>) -> Self {
        Bag { items, capacity }
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an item; returns false without changing the bag when full
    pub fn add_item(&mut self, id: LootId, type_index: usize) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(BagItem { id, type_index });
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[BagItem] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bag_respects_capacity() {
        let mut bag = Bag::new(2);
        assert!(bag.add_item(LootId(0), 0));
        assert!(bag.add_item(LootId(1), 1));
        assert!(bag.is_full());
        assert!(!bag.add_item(LootId(2), 0));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_bag_keeps_insertion_order() {
        let mut bag = Bag::new(3);
        bag.add_item(LootId(7), 1);
        bag.add_item(LootId(3), 0);
        let ids: Vec<u64> = bag.items().iter().map(|item| item.id.0).collect();
        assert_eq!(ids, vec![7, 3]);
    }

    #[test]
    fn test_bag_clear() {
        let mut bag = Bag::new(1);
        bag.add_item(LootId(0), 0);
        bag.clear();
        assert!(bag.is_empty());
        assert!(!bag.is_full());
    }

    #[test]
    fn test_zero_capacity_bag_is_always_full() {
        let mut bag = Bag::new(0);
        assert!(bag.is_full());
        assert!(!bag.add_item(LootId(0), 0));
    }
}
