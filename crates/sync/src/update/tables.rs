use std::ops::Range;

use crate::net::packets::{MAX_FLOORS, MAX_OBJECTIVES, MAX_PLAYERS, OBJECTIVES_PER_FLOOR};
use crate::world::EntityId;

/// Server player slot -> client entity.
#[derive(Debug, Clone)]
pub struct PlayerTable {
    slots: [Option<EntityId>; MAX_PLAYERS],
    last_position: [Option<u64>; MAX_PLAYERS],
    local_slot: Option<usize>,
}

impl Default for PlayerTable {
    fn default() -> Self {
        Self {
            slots: [None; MAX_PLAYERS],
            last_position: [None; MAX_PLAYERS],
            local_slot: None,
        }
    }
}

impl PlayerTable {
    pub fn get(&self, slot: usize) -> Option<EntityId> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn is_assigned(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    pub fn assign(&mut self, slot: usize, entity: EntityId) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(entity);
            self.last_position[slot] = None;
        }
    }

    pub fn unassign(&mut self, slot: usize) -> Option<EntityId> {
        let entity = self.slots.get_mut(slot)?.take();
        self.last_position[slot] = None;
        entity
    }

    /// Moves the local player to `slot`, releasing the slot it held before.
    pub fn set_local(&mut self, slot: usize, entity: EntityId) {
        if slot >= MAX_PLAYERS {
            return;
        }
        if let Some(previous) = self.local_slot.filter(|&previous| previous != slot) {
            self.unassign(previous);
        }
        self.local_slot = Some(slot);
        self.assign(slot, entity);
    }

    pub fn local_slot(&self) -> Option<usize> {
        self.local_slot
    }

    pub fn local_entity(&self) -> Option<EntityId> {
        self.local_slot.and_then(|slot| self.get(slot))
    }

    pub fn is_local(&self, slot: usize) -> bool {
        self.local_slot == Some(slot)
    }

    /// Records `timestamp` for `slot` unless an equal or newer one was already applied.
    pub fn accept_position(&mut self, slot: usize, timestamp: u64) -> bool {
        let Some(last) = self.last_position.get_mut(slot) else {
            return false;
        };
        if last.is_some_and(|applied| timestamp <= applied) {
            return false;
        }
        *last = Some(timestamp);
        true
    }

    pub fn assigned(&self) -> impl Iterator<Item = (usize, EntityId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entity)| entity.map(|e| (slot, e)))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectiveEntry {
    pub state: u8,
    pub entity: Option<EntityId>,
}

/// Cached capture state of every objective, partitioned per floor.
#[derive(Debug, Clone)]
pub struct ObjectiveTable {
    entries: [ObjectiveEntry; MAX_OBJECTIVES],
}

impl Default for ObjectiveTable {
    fn default() -> Self {
        Self {
            entries: [ObjectiveEntry::default(); MAX_OBJECTIVES],
        }
    }
}

impl ObjectiveTable {
    /// Index range of `floor`'s objectives; floors are numbered from 1.
    pub fn floor_range(floor: u32) -> Option<Range<usize>> {
        if floor == 0 || floor > MAX_FLOORS {
            return None;
        }
        let start = (floor as usize - 1) * OBJECTIVES_PER_FLOOR;
        Some(start..start + OBJECTIVES_PER_FLOOR)
    }

    /// Copies capture bytes up to the first zero. Returns how many were copied.
    pub fn mirror(&mut self, captured: &[u8]) -> usize {
        let mut copied = 0;
        for (entry, &state) in self.entries.iter_mut().zip(captured) {
            if state == 0 {
                break;
            }
            entry.state = state;
            copied += 1;
        }
        copied
    }

    pub fn get(&self, index: usize) -> Option<&ObjectiveEntry> {
        self.entries.get(index)
    }

    pub fn floor(&self, floor: u32) -> &[ObjectiveEntry] {
        match Self::floor_range(floor) {
            Some(range) => &self.entries[range],
            None => &[],
        }
    }

    pub fn bind(&mut self, index: usize, entity: EntityId) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.entity = Some(entity);
                true
            }
            None => false,
        }
    }

    pub fn unbind_floor(&mut self, floor: u32) {
        if let Some(range) = Self::floor_range(floor) {
            for entry in &mut self.entries[range] {
                entry.entity = None;
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
