pub mod net;
pub mod update;
pub mod world;

pub use net::{
    Fetch, NetConfig, NetError, NetworkRouter, NetworkStats, Packet, PacketError, PacketType,
    Reliability,
};
pub use update::{
    AnimationLoader, Appearance, ChatHistory, ChatLog, ClientUpdateSystem, FloorBuilder,
    ObjectiveTable, PlayerTable, TickOutcome, UpdateContext,
};
pub use world::{CollisionKind, ComponentMask, Direction, Entity, EntityId, Team, World};
