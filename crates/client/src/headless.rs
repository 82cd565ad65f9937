use std::collections::HashMap;

use glam::Vec2;

use floorsync::net::packets::OBJECTIVES_PER_FLOOR;
use floorsync::{AnimationLoader, Appearance, EntityId, FloorBuilder, World};

const OBJECTIVE_COLUMNS: usize = 4;
const OBJECTIVE_SPACING: f32 = 128.0;

/// Remembers which animation set each player would be drawn with.
#[derive(Debug, Default)]
pub struct AppearanceLog {
    loaded: HashMap<EntityId, Appearance>,
}

impl AppearanceLog {
    pub fn forget_missing(&mut self, world: &World) {
        self.loaded.retain(|id, _| world.contains(*id));
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }
}

impl AnimationLoader for AppearanceLog {
    fn load(&mut self, _world: &mut World, entity: EntityId, appearance: Appearance) {
        log::debug!("Entity {} uses {:?}", entity.id(), appearance);
        self.loaded.insert(entity, appearance);
    }
}

/// Lays each floor's objectives out on a fixed grid.
#[derive(Debug, Default)]
pub struct GridFloors {
    current: Option<u32>,
}

impl GridFloors {
    pub fn current(&self) -> Option<u32> {
        self.current
    }
}

impl FloorBuilder for GridFloors {
    fn rebuild(&mut self, world: &mut World, floor: u32) {
        let stale: Vec<EntityId> = world.objectives().collect();
        for id in stale {
            world.despawn(id);
        }

        for i in 0..OBJECTIVES_PER_FLOOR {
            let column = (i % OBJECTIVE_COLUMNS) as f32;
            let row = (i / OBJECTIVE_COLUMNS) as f32;
            let pos = Vec2::new(64.0 + column * OBJECTIVE_SPACING, 64.0 + row * OBJECTIVE_SPACING);
            world.spawn_objective(pos, floor);
        }

        self.current = Some(floor);
        log::info!("Built floor {}", floor);
    }
}
