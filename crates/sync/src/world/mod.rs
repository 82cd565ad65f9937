mod entity;

use std::collections::BTreeMap;

use glam::Vec2;

pub use entity::{
    CollisionKind, ComponentMask, Direction, Entity, EntityId, Movement, ObjectiveInfo,
    PlayerInfo, Position, Team,
};

/// Client-side entity store mutated by the update system.
///
/// Entities are kept ordered by id so objective entities enumerate in the
/// order the floor builder created them.
#[derive(Debug)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    next_entity_id: u32,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_entity_id: 1,
        }
    }

    pub fn spawn_player(&mut self, spawn: Vec2, level: u32) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(id, Entity::player(id, spawn, level));
        id
    }

    pub fn spawn_controllable(&mut self, spawn: Vec2, level: u32) -> EntityId {
        let id = self.allocate_id();
        let mut entity = Entity::player(id, spawn, level);
        entity.mask = ComponentMask::LOCAL_PLAYER;
        self.entities.insert(id, entity);
        id
    }

    pub fn spawn_objective(&mut self, pos: Vec2, level: u32) -> EntityId {
        let id = self.allocate_id();
        self.entities.insert(id, Entity::objective(id, pos, level));
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// The player entity driven by local input, if one has been spawned.
    pub fn controllable(&self) -> Option<EntityId> {
        self.entities
            .values()
            .find(|e| e.has(ComponentMask::LOCAL_PLAYER.difference(ComponentMask::VISIBLE)))
            .map(|e| e.id)
    }

    pub fn objectives(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .values()
            .filter(|e| e.has(ComponentMask::OBJECTIVE))
            .map(|e| e.id)
    }

    pub fn objectives_on(&self, level: u32) -> impl Iterator<Item = EntityId> + '_ {
        self.entities
            .values()
            .filter(move |e| e.has(ComponentMask::OBJECTIVE) && e.position.level == level)
            .map(|e| e.id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }
}
