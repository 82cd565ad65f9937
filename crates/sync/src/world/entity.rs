use bitflags::bitflags;
use glam::Vec2;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentMask: u32 {
        const POSITION = 1 << 0;
        const MOVEMENT = 1 << 1;
        const PLAYER = 1 << 2;
        const CONTROLLABLE = 1 << 3;
        const RENDER_PLAYER = 1 << 4;
        const COLLISION = 1 << 5;
        const OBJECTIVE = 1 << 6;
    }
}

impl ComponentMask {
    pub const REMOTE_PLAYER: Self = Self::POSITION
        .union(Self::MOVEMENT)
        .union(Self::PLAYER)
        .union(Self::RENDER_PLAYER)
        .union(Self::COLLISION);

    pub const LOCAL_PLAYER: Self = Self::REMOTE_PLAYER.union(Self::CONTROLLABLE);

    /// Toggled when a remote player leaves or re-enters the local floor.
    pub const VISIBLE: Self = Self::RENDER_PLAYER.union(Self::COLLISION);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn id(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Team {
    #[default]
    None,
    Guards,
    Hackers,
}

impl Team {
    pub fn from_wire(value: u32) -> Self {
        match value {
            1 => Self::Guards,
            2 => Self::Hackers,
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Down,
    Up,
    Left,
    Right,
}

impl Direction {
    /// Horizontal first, then vertical; the last component set wins.
    pub fn from_velocity(velocity: Vec2, current: Direction) -> Direction {
        let mut facing = current;
        if velocity.x < 0.0 {
            facing = Self::Left;
        } else if velocity.x > 0.0 {
            facing = Self::Right;
        }
        if velocity.y < 0.0 {
            facing = Self::Down;
        } else if velocity.y > 0.0 {
            facing = Self::Up;
        }
        facing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionKind {
    #[default]
    Hacker,
    Guard,
    Objective,
}

impl CollisionKind {
    pub fn for_team(team: Team) -> Self {
        match team {
            Team::Guards => Self::Guard,
            _ => Self::Hacker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub pos: Vec2,
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Movement {
    pub velocity: Vec2,
    pub last_direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerInfo {
    pub team: Team,
    pub number: u32,
    pub ready: bool,
    pub character: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectiveInfo {
    pub status: u8,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub mask: ComponentMask,
    pub position: Position,
    pub movement: Movement,
    pub player: PlayerInfo,
    pub objective: ObjectiveInfo,
    pub collision: CollisionKind,
}

impl Entity {
    pub fn new(id: EntityId, mask: ComponentMask) -> Self {
        Self {
            id,
            mask,
            position: Position::default(),
            movement: Movement::default(),
            player: PlayerInfo::default(),
            objective: ObjectiveInfo::default(),
            collision: CollisionKind::default(),
        }
    }

    pub fn player(id: EntityId, spawn: Vec2, level: u32) -> Self {
        Self {
            position: Position { pos: spawn, level },
            ..Self::new(id, ComponentMask::REMOTE_PLAYER)
        }
    }

    pub fn objective(id: EntityId, pos: Vec2, level: u32) -> Self {
        Self {
            position: Position { pos, level },
            collision: CollisionKind::Objective,
            ..Self::new(id, ComponentMask::POSITION | ComponentMask::OBJECTIVE)
        }
    }

    pub fn has(&self, components: ComponentMask) -> bool {
        self.mask.contains(components)
    }

    pub fn is_visible(&self) -> bool {
        self.mask.intersects(ComponentMask::VISIBLE)
    }
}
