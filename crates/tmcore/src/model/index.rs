//! Identifier index owned by the model root.
//!
//! Maps every top-level identity and threat event to its position in the
//! model's collections. Rebuilt after loading and after removals, updated in
//! place on insertion.

use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Schema(usize),
    Entity(usize),
    DataFlow(usize),
    ThreatType(usize),
    /// (entity position, event position)
    EntityThreat(usize, usize),
    /// (data flow position, event position)
    FlowThreat(usize, usize),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ModelIndex {
    slots: HashMap<Uuid, Slot>,
}

impl ModelIndex {
    pub(crate) fn insert(&mut self, id: Uuid, slot: Slot) {
        self.slots.insert(id, slot);
    }

    pub(crate) fn get(&self, id: &Uuid) -> Option<Slot> {
        self.slots.get(id).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let mut index = ModelIndex::default();
        let id = Uuid::new_v4();
        index.insert(id, Slot::EntityThreat(2, 0));

        assert_eq!(index.get(&id), Some(Slot::EntityThreat(2, 0)));
        assert_eq!(index.get(&Uuid::new_v4()), None);
        assert_eq!(index.len(), 1);
    }
}
