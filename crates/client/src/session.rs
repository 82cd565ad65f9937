use std::time::{Duration, Instant};

use anyhow::Result;
use glam::Vec2;

use floorsync::net::packets::{Chat, FloorMoveRequest, PlayerName, PositionUpdate};
use floorsync::update::DEFAULT_SPAWN;
use floorsync::{
    ChatHistory, ClientUpdateSystem, EntityId, FloorBuilder, NetConfig, NetError, NetworkRouter,
    PacketType, UpdateContext, World,
};

use crate::headless::{AppearanceLog, GridFloors};

const WALK_SPEED: f32 = 120.0;
const WALK_RANGE: f32 = 200.0;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub tick_rate: u32,
    pub max_ticks: Option<u64>,
    pub floor: Option<u32>,
    pub say: Option<String>,
}

/// One connected client: the router, the update system and the world they feed.
pub struct Session {
    router: NetworkRouter,
    update: ClientUpdateSystem,
    world: World,
    animations: AppearanceLog,
    floors: GridFloors,
    chat: ChatHistory,
    config: SessionConfig,
    local: EntityId,
    player_number: Option<u32>,
    tick_duration: Duration,
    last_tick_time: Instant,
    accumulator: Duration,
    ticks: u64,
}

impl Session {
    pub fn connect(net: NetConfig, config: SessionConfig) -> Result<Self> {
        let router = NetworkRouter::connect(net)?;

        let mut world = World::new();
        let mut floors = GridFloors::default();
        let local = world.spawn_controllable(DEFAULT_SPAWN, 1);
        floors.rebuild(&mut world, 1);

        router.send(PacketType::PlayerName, &PlayerName::new(0, &config.name))?;

        Ok(Self {
            router,
            update: ClientUpdateSystem::new(),
            world,
            animations: AppearanceLog::default(),
            floors,
            chat: ChatHistory::default(),
            tick_duration: Duration::from_secs_f64(1.0 / config.tick_rate as f64),
            config,
            local,
            player_number: None,
            last_tick_time: Instant::now(),
            accumulator: Duration::ZERO,
            ticks: 0,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        loop {
            if !self.tick_once()? {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        let stats = self.router.stats();
        log::info!(
            "Session over after {} ticks on floor {:?}: {} players seen, {} packets in, {} out, {} corrupted",
            self.ticks,
            self.floors.current(),
            self.animations.len(),
            stats.packets_received,
            stats.packets_sent,
            stats.packets_corrupted
        );
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.router.shutdown();
    }

    fn tick_once(&mut self) -> Result<bool> {
        let now = Instant::now();
        self.accumulator += now - self.last_tick_time;
        self.last_tick_time = now;

        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            if !self.tick()? {
                return Ok(false);
            }
            self.ticks += 1;
            if self.config.max_ticks.is_some_and(|max| self.ticks >= max) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn tick(&mut self) -> Result<bool> {
        if !self.router.is_connected() {
            return Err(NetError::NotConnected.into());
        }
        let fetch = self.router.fetch_pending_updates();

        let outcome = {
            let mut ctx = UpdateContext {
                world: &mut self.world,
                animations: &mut self.animations,
                chat: &mut self.chat,
                floors: &mut self.floors,
            };
            self.update.apply(fetch, &mut ctx)?
        };

        if let Some(reason) = outcome.shutdown {
            return Err(NetError::ServerShutdown(reason).into());
        }
        if outcome.applied > 0 {
            self.animations.forget_missing(&self.world);
        }
        if let Some(number) = outcome.connected {
            self.player_number = Some(number);
            self.on_connected(number)?;
        }
        if let Some(winner) = outcome.game_over {
            log::info!("{:?} won the game", winner);
            return Ok(false);
        }

        if let Some(number) = self.player_number {
            self.walk();
            self.send_position(number)?;
        }

        Ok(true)
    }

    fn on_connected(&mut self, number: u32) -> Result<()> {
        if let Some(text) = self.config.say.take() {
            self.router.send(PacketType::Chat, &Chat::new(number, &text))?;
        }

        if let Some(floor) = self.config.floor.take()
            && let Some(entity) = self.world.get(self.local)
        {
            let request = FloorMoveRequest {
                current_floor: entity.position.level,
                desired_floor: floor,
                x: entity.position.pos.x,
                y: entity.position.pos.y,
            };
            self.router.send(PacketType::FloorMoveRequest, &request)?;
            self.update.begin_floor_transition();
            log::info!("Requested floor {}", floor);
        }

        Ok(())
    }

    /// Paces back and forth around the spawn point.
    fn walk(&mut self) {
        let dt = self.tick_duration.as_secs_f32();
        let Some(entity) = self.world.get_mut(self.local) else {
            return;
        };

        let offset = entity.position.pos.x - DEFAULT_SPAWN.x;
        let mut velocity = entity.movement.velocity;
        if velocity == Vec2::ZERO || offset.abs() >= WALK_RANGE {
            let heading = if offset > 0.0 { -1.0 } else { 1.0 };
            velocity = Vec2::new(heading * WALK_SPEED, 0.0);
        }

        entity.movement.velocity = velocity;
        entity.position.pos += velocity * dt;
    }

    fn send_position(&self, number: u32) -> Result<()> {
        let Some(entity) = self.world.get(self.local) else {
            return Ok(());
        };

        let update = PositionUpdate {
            player_number: number,
            floor: entity.position.level,
            x: entity.position.pos.x,
            y: entity.position.pos.y,
            vel_x: entity.movement.velocity.x,
            vel_y: entity.movement.velocity.y,
        };
        match self.router.send(PacketType::PositionUpdate, &update) {
            Err(NetError::ResourceExhaustion(what)) => {
                log::warn!("Skipping position update: {}", what);
                Ok(())
            }
            other => Ok(other?),
        }
    }
}
